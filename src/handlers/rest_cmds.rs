// rest_cmds.rs - messaging and presence commands
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

use async_trait::async_trait;

use crate::modes::{can_speak_when_moderated, ChannelMode};
use crate::reply::Reply;
use crate::reply::Reply::*;
use crate::router::{Context, Handler, HandlerResult};

pub(crate) struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        send_message(ctx, "PRIVMSG");
        Ok(())
    }
}

pub(crate) struct NoticeHandler;

#[async_trait]
impl Handler for NoticeHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        send_message(ctx, "NOTICE");
        Ok(())
    }
}

// PRIVMSG and NOTICE differ only in the command word and in NOTICE never
// generating replies, error numerics included.
fn send_message(ctx: &Context<'_>, command: &str) {
    let notice = command == "NOTICE";
    let display = ctx.client.display_name();
    let reply_err = |r: Reply<'_>| {
        if !notice {
            ctx.reply(r);
        }
    };
    let targets = match ctx.msg.params.first() {
        Some(targets) => *targets,
        None => {
            reply_err(ErrNoRecipient411 {
                client: &display,
                command,
            });
            return;
        }
    };
    let text = match ctx.msg.params.get(1) {
        Some(text) => *text,
        None => {
            reply_err(ErrNoTextToSend412 { client: &display });
            return;
        }
    };

    for target in targets.split(',').filter(|t| !t.is_empty()) {
        let line = format!(":{} {} {} :{}", ctx.client.source(), command, target, text);
        if target.starts_with('#') || target.starts_with('&') {
            let channel = match ctx.server.channels.get(target) {
                Some(channel) => channel,
                None => {
                    reply_err(ErrNoSuchChannel403 {
                        client: &display,
                        channel: target,
                    });
                    continue;
                }
            };
            let roles = channel.roles_of(ctx.client.id);
            let allowed = {
                let state = channel.state();
                if state.modes.contains(ChannelMode::NoExternal) && roles.is_none() {
                    false
                } else if state.modes.contains(ChannelMode::Moderated) {
                    can_speak_when_moderated(roles.unwrap_or_default())
                } else {
                    true
                }
            };
            if !allowed {
                reply_err(ErrCannotSendToChan404 {
                    client: &display,
                    channel: target,
                });
                continue;
            }
            ctx.server
                .broadcast_channel(&channel, &line, Some(ctx.client.id));
        } else {
            match ctx.server.clients.find_by_nick(target) {
                Some(peer) => {
                    // read before sending: a send can kill the peer,
                    // which takes the state write lock, and the peer may
                    // be the sender itself
                    let away = peer.state().away.clone();
                    peer.send_line(line);
                    if !notice {
                        if let Some(away) = away {
                            ctx.reply(RplAway301 {
                                client: &display,
                                nick: target,
                                message: &away,
                            });
                        }
                    }
                }
                None => {
                    reply_err(ErrNoSuchNick401 {
                        client: &display,
                        nick: target,
                    });
                }
            }
        }
    }
}

pub(crate) struct AwayHandler;

#[async_trait]
impl Handler for AwayHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        match ctx.msg.params.first() {
            Some(text) if !text.is_empty() => {
                ctx.client.state_mut().away = Some(text.to_string());
                ctx.reply(RplNowAway306 { client: &display });
            }
            _ => {
                ctx.client.state_mut().away = None;
                ctx.reply(RplUnAway305 { client: &display });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::config::MainConfig;
    use crate::server::test::*;

    async fn join_and_drain(conn: &mut TestConn, channel: &str) {
        conn.send(&format!("JOIN {}", channel)).await;
        for _ in 0..4 {
            conn.recv().await;
        }
    }

    #[tokio::test]
    async fn test_privmsg_channel() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        join_and_drain(&mut alice, "#c").await;
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;
        bob.send("JOIN #c").await;
        alice.recv().await;
        for _ in 0..4 {
            bob.recv().await;
        }

        alice.send("PRIVMSG #c :hello there").await;
        assert_eq!(
            ":alice!~alice@127.0.0.1 PRIVMSG #c :hello there",
            bob.recv().await
        );
        // the sender gets no echo; the next reply is the PONG
        alice.send("PING :sync").await;
        assert_eq!(
            ":irc.localhost PONG irc.localhost :sync",
            alice.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_privmsg_no_external() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        join_and_drain(&mut alice, "#c").await;
        alice.send("MODE #c +n").await;
        alice.recv().await;

        let mut carol = TestConn::connect(port).await;
        carol.login("carol", "carol").await;
        carol.send("PRIVMSG #c :from outside").await;
        assert_eq!(
            ":irc.localhost 404 carol #c :Cannot send to channel",
            carol.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_privmsg_moderated() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        join_and_drain(&mut alice, "#m").await;
        alice.send("MODE #m +m").await;
        alice.recv().await;

        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;
        bob.send("JOIN #m").await;
        alice.recv().await;
        for _ in 0..4 {
            bob.recv().await;
        }
        bob.send("PRIVMSG #m :me me me").await;
        assert_eq!(
            ":irc.localhost 404 bob #m :Cannot send to channel",
            bob.recv().await
        );

        alice.send("MODE #m +v bob").await;
        alice.recv().await;
        bob.recv().await;
        bob.send("PRIVMSG #m :me me me").await;
        assert_eq!(
            ":bob!~bob@127.0.0.1 PRIVMSG #m :me me me",
            alice.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_privmsg_direct_and_away() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;

        alice.send("PRIVMSG bob :psst").await;
        assert_eq!(":alice!~alice@127.0.0.1 PRIVMSG bob :psst", bob.recv().await);

        bob.send("AWAY :out for lunch").await;
        assert_eq!(
            ":irc.localhost 306 bob :You have been marked as being away",
            bob.recv().await
        );
        alice.send("PRIVMSG bob :psst").await;
        assert_eq!(
            ":irc.localhost 301 alice bob :out for lunch",
            alice.recv().await
        );
        assert_eq!(":alice!~alice@127.0.0.1 PRIVMSG bob :psst", bob.recv().await);

        bob.send("AWAY").await;
        assert_eq!(
            ":irc.localhost 305 bob :You are no longer marked as being away",
            bob.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_privmsg_self_while_away() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        alice.send("AWAY :brb").await;
        assert_eq!(
            ":irc.localhost 306 alice :You have been marked as being away",
            alice.recv().await
        );

        // sender and recipient are the same client here
        alice.send("PRIVMSG alice :note to self").await;
        assert_eq!(
            ":alice!~alice@127.0.0.1 PRIVMSG alice :note to self",
            alice.recv().await
        );
        assert_eq!(":irc.localhost 301 alice alice :brb", alice.recv().await);
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_privmsg_missing_parts() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut conn = TestConn::connect(port).await;
        conn.login("alice", "alice").await;
        conn.send("PRIVMSG").await;
        assert_eq!(
            ":irc.localhost 411 alice :No recipient given (PRIVMSG)",
            conn.recv().await
        );
        conn.send("PRIVMSG bob").await;
        assert_eq!(":irc.localhost 412 alice :No text to send", conn.recv().await);
        conn.send("PRIVMSG ghost :anyone?").await;
        assert_eq!(
            ":irc.localhost 401 alice ghost :No such nick/channel",
            conn.recv().await
        );
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_notice_suppresses_errors() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut alice = TestConn::connect(port).await;
        alice.login("alice", "alice").await;
        let mut bob = TestConn::connect(port).await;
        bob.login("bob", "bob").await;

        alice.send("NOTICE ghost :hello?").await;
        alice.send("NOTICE").await;
        alice.send("NOTICE bob :real one").await;
        assert_eq!(
            ":alice!~alice@127.0.0.1 NOTICE bob :real one",
            bob.recv().await
        );
        // no error numerics arrived in between
        alice.send("PING :sync").await;
        assert_eq!(
            ":irc.localhost PONG irc.localhost :sync",
            alice.recv().await
        );
        quit_test_server(server, handle).await;
    }
}
