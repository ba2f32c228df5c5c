// srv_query_cmds.rs - server query commands
//
// stonechat-ircd - single-server IRC daemon
// Copyright (C) 2024  The stonechat-ircd authors
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::Client;
use crate::mask::Mask;
use crate::modes::{role_prefix, UserMode};
use crate::reply::Reply::*;
use crate::router::{Context, Handler, HandlerResult};
use crate::server::VERSION_STR;

pub(crate) struct MotdHandler;

#[async_trait]
impl Handler for MotdHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.server.send_motd(ctx.client);
        Ok(())
    }
}

pub(crate) struct VersionHandler;

#[async_trait]
impl Handler for VersionHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.reply(RplVersion351 {
            client: &ctx.client.display_name(),
            version: VERSION_STR,
            server: &ctx.server.config.name,
            comments: "",
        });
        Ok(())
    }
}

pub(crate) struct LusersHandler;

#[async_trait]
impl Handler for LusersHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.server.send_lusers(ctx.client);
        Ok(())
    }
}

pub(crate) struct WhoHandler;

// H here, G gone, * for server operators, then the channel role prefix.
fn who_flags(client: &Arc<Client>, prefix: &str) -> String {
    let state = client.state();
    let mut flags = String::new();
    flags.push(if state.away.is_some() { 'G' } else { 'H' });
    if state.modes.contains(UserMode::Oper) {
        flags.push('*');
    }
    flags.push_str(prefix);
    flags
}

fn send_who_reply(ctx: &Context<'_>, display: &str, channel: &str, target: &Arc<Client>, prefix: &str) {
    let flags = who_flags(target, prefix);
    let (nick, username, host, realname) = {
        let state = target.state();
        (
            state.nick.clone().unwrap_or_default(),
            state.username.clone().unwrap_or_default(),
            state.hostname.clone(),
            state.realname.clone().unwrap_or_default(),
        )
    };
    ctx.reply(RplWhoReply352 {
        client: display,
        channel,
        username: &username,
        host: &host,
        server: &ctx.server.config.name,
        nick: &nick,
        flags: &flags,
        realname: &realname,
    });
}

#[async_trait]
impl Handler for WhoHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        let mask = ctx.msg.params[0];
        if mask.starts_with('#') || mask.starts_with('&') {
            if let Some(channel) = ctx.server.channels.get(mask) {
                if channel.is_visible_to(ctx.client.id) {
                    for (id, roles) in channel.members_snapshot() {
                        if let Some(member) = ctx.server.clients.get(id) {
                            send_who_reply(ctx, &display, mask, &member, role_prefix(roles));
                        }
                    }
                }
            }
        } else if let Ok(mask) = Mask::compile(mask) {
            for target in ctx.server.clients.all() {
                if !target.is_registered() {
                    continue;
                }
                let (nick, invisible) = {
                    let state = target.state();
                    (
                        state.nick.clone().unwrap_or_default(),
                        state.modes.contains(UserMode::Invisible),
                    )
                };
                if invisible && target.id != ctx.client.id {
                    continue;
                }
                if mask.matches(&nick) {
                    send_who_reply(ctx, &display, "*", &target, "");
                }
            }
        }
        ctx.reply(RplEndOfWho315 {
            client: &display,
            mask,
        });
        Ok(())
    }
}

pub(crate) struct WhoisHandler;

#[async_trait]
impl Handler for WhoisHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        // with two arguments the first is a target server, which for a
        // single server is just skipped
        let nicks = ctx.msg.params[ctx.msg.params.len() - 1];
        for nick in nicks.split(',').filter(|n| !n.is_empty()) {
            match ctx.server.clients.find_by_nick(nick) {
                Some(target) => {
                    let (username, host, realname, away, oper) = {
                        let state = target.state();
                        (
                            state.username.clone().unwrap_or_default(),
                            state.hostname.clone(),
                            state.realname.clone().unwrap_or_default(),
                            state.away.clone(),
                            state.modes.contains(UserMode::Oper),
                        )
                    };
                    ctx.reply(RplWhoIsUser311 {
                        client: &display,
                        nick,
                        username: &username,
                        host: &host,
                        realname: &realname,
                    });
                    let mut channels = Vec::new();
                    for channel in ctx.server.channels.joined_by(target.id) {
                        if !channel.is_visible_to(ctx.client.id) {
                            continue;
                        }
                        let roles = channel.roles_of(target.id).unwrap_or_default();
                        channels.push(format!("{}{}", role_prefix(roles), channel.name));
                    }
                    if !channels.is_empty() {
                        ctx.reply(RplWhoIsChannels319 {
                            client: &display,
                            nick,
                            channels: &channels.join(" "),
                        });
                    }
                    ctx.reply(RplWhoIsServer312 {
                        client: &display,
                        nick,
                        server: &ctx.server.config.name,
                        server_info: &ctx.server.config.info,
                    });
                    if oper {
                        ctx.reply(RplWhoIsOperator313 {
                            client: &display,
                            nick,
                        });
                    }
                    if let Some(away) = away {
                        ctx.reply(RplAway301 {
                            client: &display,
                            nick,
                            message: &away,
                        });
                    }
                }
                None => {
                    ctx.reply(ErrNoSuchNick401 {
                        client: &display,
                        nick,
                    });
                }
            }
            ctx.reply(RplEndOfWhoIs318 {
                client: &display,
                nick,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::config::MainConfig;
    use crate::server::test::*;
    use crate::server::VERSION_STR;

    #[tokio::test]
    async fn test_motd_configured() {
        let mut config = MainConfig::default();
        config.motd = Some(vec!["first line".to_string(), "second line".to_string()]);
        let (server, handle, port) = run_test_server(config).await;
        let mut conn = TestConn::connect(port).await;
        conn.login("alice", "alice").await;
        conn.send("MOTD").await;
        assert_eq!(
            ":irc.localhost 375 alice :- irc.localhost Message of the day - ",
            conn.recv().await
        );
        assert_eq!(":irc.localhost 372 alice :first line", conn.recv().await);
        assert_eq!(":irc.localhost 372 alice :second line", conn.recv().await);
        assert_eq!(
            ":irc.localhost 376 alice :End of /MOTD command.",
            conn.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_motd_missing() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut conn = TestConn::connect(port).await;
        conn.login("alice", "alice").await;
        conn.send("MOTD").await;
        assert_eq!(
            ":irc.localhost 422 alice :MOTD File is missing",
            conn.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_version() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut conn = TestConn::connect(port).await;
        conn.login("alice", "alice").await;
        conn.send("VERSION").await;
        assert_eq!(
            format!(":irc.localhost 351 alice {} irc.localhost :", VERSION_STR),
            conn.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_lusers() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;

        alice.send("LUSERS").await;
        assert_eq!(
            ":irc.localhost 251 alice :There are 2 users and 0 invisible on 1 servers",
            alice.recv().await
        );
        assert_eq!(
            ":irc.localhost 252 alice 0 :operator(s) online",
            alice.recv().await
        );
        assert_eq!(
            ":irc.localhost 253 alice 0 :unknown connection(s)",
            alice.recv().await
        );
        assert_eq!(
            ":irc.localhost 254 alice 0 :channels formed",
            alice.recv().await
        );
        assert_eq!(
            ":irc.localhost 255 alice :I have 2 clients and 1 servers",
            alice.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_who_channel() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        alice.send("JOIN #w").await;
        for _ in 0..4 {
            alice.recv().await;
        }
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;
        bob.send("JOIN #w").await;
        alice.recv().await;

        alice.send("WHO #w").await;
        let mut lines = vec![alice.recv().await, alice.recv().await];
        lines.sort();
        assert_eq!(
            ":irc.localhost 352 alice #w ~alice 127.0.0.1 irc.localhost alice H~ :0 alice",
            lines[0]
        );
        assert_eq!(
            ":irc.localhost 352 alice #w ~bob 127.0.0.1 irc.localhost bob H :0 bob",
            lines[1]
        );
        assert_eq!(
            ":irc.localhost 315 alice #w :End of WHO list",
            alice.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_who_secret_channel_hidden() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;
        bob.send("JOIN #s").await;
        for _ in 0..4 {
            bob.recv().await;
        }
        bob.send("MODE #s +s").await;
        bob.recv().await;

        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        alice.send("WHO #s").await;
        assert_eq!(
            ":irc.localhost 315 alice #s :End of WHO list",
            alice.recv().await
        );

        // members still get the listing
        bob.send("WHO #s").await;
        assert_eq!(
            ":irc.localhost 352 bob #s ~bob 127.0.0.1 irc.localhost bob H~ :0 bob",
            bob.recv().await
        );
        assert_eq!(":irc.localhost 315 bob #s :End of WHO list", bob.recv().await);
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_who_mask_skips_invisible() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;

        alice.send("WHO b*").await;
        assert_eq!(
            ":irc.localhost 352 alice * ~bob 127.0.0.1 irc.localhost bob H :0 bob",
            alice.recv().await
        );
        assert_eq!(
            ":irc.localhost 315 alice b* :End of WHO list",
            alice.recv().await
        );

        bob.send("MODE bob +i").await;
        bob.recv().await;
        alice.send("WHO b*").await;
        assert_eq!(
            ":irc.localhost 315 alice b* :End of WHO list",
            alice.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_whois() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;
        bob.send("JOIN #wz").await;
        for _ in 0..4 {
            bob.recv().await;
        }

        alice.send("WHOIS bob").await;
        assert_eq!(
            ":irc.localhost 311 alice bob ~bob 127.0.0.1 * :bob",
            alice.recv().await
        );
        assert_eq!(":irc.localhost 319 alice bob :~#wz", alice.recv().await);
        assert_eq!(
            ":irc.localhost 312 alice bob irc.localhost :This is IRC server",
            alice.recv().await
        );
        assert_eq!(
            ":irc.localhost 318 alice bob :End of /WHOIS list",
            alice.recv().await
        );

        alice.send("WHOIS ghost").await;
        assert_eq!(
            ":irc.localhost 401 alice ghost :No such nick/channel",
            alice.recv().await
        );
        assert_eq!(
            ":irc.localhost 318 alice ghost :End of /WHOIS list",
            alice.recv().await
        );
        quit_test_server(server, handle).await;
    }
}
