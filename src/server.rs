// server.rs - shared server state and the accept loop
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

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::prelude::*;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::*;

use crate::channel::Channel;
use crate::client::{Client, ClientId};
use crate::config::MainConfig;
use crate::conn;
use crate::handlers::channel_cmds::*;
use crate::handlers::conn_cmds::*;
use crate::handlers::rest_cmds::*;
use crate::handlers::srv_query_cmds::*;
use crate::message::{self, MessageError};
use crate::modes::{role_prefix, ChannelMode, UserMode};
use crate::reply::Reply::*;
use crate::router::{Context, DispatchError, Middleware, MinParams, NeedRegistered, Router, TraceCommand};
use crate::store::{ChannelStore, ClientStore};

pub(crate) const VERSION_STR: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

pub(crate) struct Server {
    pub(crate) config: MainConfig,
    pub(crate) clients: ClientStore,
    pub(crate) channels: ChannelStore,
    router: Router,
    pub(crate) created: String,
    quit_sender: Mutex<Option<oneshot::Sender<String>>>,
    quit_receiver: Mutex<Option<oneshot::Receiver<String>>>,
}

impl Server {
    pub(crate) fn new(config: MainConfig) -> Server {
        let mut router = Router::new();
        router.register_global(Arc::new(TraceCommand));

        let reg: Arc<dyn Middleware> = Arc::new(NeedRegistered);
        // the middleware slice wraps inner-to-outer: NeedRegistered is
        // listed last so it refuses before MinParams even looks.
        router.register("PASS", Arc::new(PassHandler), &[Arc::new(MinParams(1))]);
        router.register("NICK", Arc::new(NickHandler), &[Arc::new(MinParams(1))]);
        router.register("USER", Arc::new(UserHandler), &[Arc::new(MinParams(4))]);
        router.register(
            "OPER",
            Arc::new(OperHandler),
            &[Arc::new(MinParams(2)), reg.clone()],
        );
        router.register("QUIT", Arc::new(QuitHandler), &[]);
        router.register("PING", Arc::new(PingHandler), &[]);
        router.register("PONG", Arc::new(PongHandler), &[]);
        router.register(
            "JOIN",
            Arc::new(JoinHandler),
            &[Arc::new(MinParams(1)), reg.clone()],
        );
        router.register(
            "PART",
            Arc::new(PartHandler),
            &[Arc::new(MinParams(1)), reg.clone()],
        );
        router.register(
            "TOPIC",
            Arc::new(TopicHandler),
            &[Arc::new(MinParams(1)), reg.clone()],
        );
        router.register("NAMES", Arc::new(NamesHandler), &[reg.clone()]);
        router.register("LIST", Arc::new(ListHandler), &[reg.clone()]);
        router.register(
            "INVITE",
            Arc::new(InviteHandler),
            &[Arc::new(MinParams(2)), reg.clone()],
        );
        router.register(
            "KICK",
            Arc::new(KickHandler),
            &[Arc::new(MinParams(2)), reg.clone()],
        );
        router.register(
            "MODE",
            Arc::new(ModeHandler),
            &[Arc::new(MinParams(1)), reg.clone()],
        );
        router.register("PRIVMSG", Arc::new(PrivmsgHandler), &[reg.clone()]);
        router.register("NOTICE", Arc::new(NoticeHandler), &[reg.clone()]);
        router.register("AWAY", Arc::new(AwayHandler), &[reg.clone()]);
        router.register(
            "WHO",
            Arc::new(WhoHandler),
            &[Arc::new(MinParams(1)), reg.clone()],
        );
        router.register(
            "WHOIS",
            Arc::new(WhoisHandler),
            &[Arc::new(MinParams(1)), reg.clone()],
        );
        router.register("LUSERS", Arc::new(LusersHandler), &[reg.clone()]);
        router.register("VERSION", Arc::new(VersionHandler), &[reg.clone()]);
        router.register("MOTD", Arc::new(MotdHandler), &[reg]);

        let (quit_sender, quit_receiver) = oneshot::channel();
        Server {
            config,
            clients: ClientStore::new(),
            channels: ChannelStore::new(),
            router,
            created: Local::now().to_rfc2822(),
            quit_sender: Mutex::new(Some(quit_sender)),
            quit_receiver: Mutex::new(Some(quit_receiver)),
        }
    }

    /// Parses and dispatches one inbound line from the reader worker.
    pub(crate) async fn handle_line(&self, client: &Arc<Client>, line: &str) {
        match message::parse(line) {
            Ok(msg) => {
                if msg.command.is_empty() {
                    return;
                }
                let ctx = Context {
                    server: self,
                    client,
                    msg: &msg,
                };
                if let Err(DispatchError::UnknownCommand(command)) =
                    self.router.dispatch(&ctx).await
                {
                    client.send_msg(
                        &self.config.name,
                        ErrUnknownCommand421 {
                            client: &client.display_name(),
                            command: &command,
                        },
                    );
                }
            }
            Err(MessageError::TooLong) => {
                client.send_msg(
                    &self.config.name,
                    ErrInputTooLong417 {
                        client: &client.display_name(),
                    },
                );
            }
            Err(e) => {
                debug!("Dropping bad line from {}: {}", client.addr, e);
            }
        }
    }

    /// Queues one line to every channel member, optionally skipping one.
    pub(crate) fn broadcast_channel(
        &self,
        channel: &Arc<Channel>,
        line: &str,
        except: Option<ClientId>,
    ) {
        for id in channel.member_ids() {
            if Some(id) == except {
                continue;
            }
            if let Some(member) = self.clients.get(id) {
                member.send_line(line.to_string());
            }
        }
    }

    /// Completes registration once both NICK and USER arrived, checking the
    /// server password and sending the welcome burst.
    pub(crate) fn try_complete_registration(&self, client: &Arc<Client>) {
        {
            let state = client.state();
            if state.registered || state.nick.is_none() || state.username.is_none() {
                return;
            }
        }
        if let Some(ref required) = self.config.password {
            let given = client.state().password.clone();
            if given.as_deref() != Some(required.as_str()) {
                client.send_msg(
                    &self.config.name,
                    ErrPasswdMismatch464 {
                        client: &client.display_name(),
                    },
                );
                client.kill("Bad password");
                return;
            }
        }
        let (nick, user, host) = {
            let mut state = client.state_mut();
            state.registered = true;
            (
                state.nick.clone().unwrap_or_default(),
                state.username.clone().unwrap_or_default(),
                state.hostname.clone(),
            )
        };
        let config = &self.config;
        client.send_msg(
            &config.name,
            RplWelcome001 {
                client: &nick,
                networkname: &config.network,
                nick: &nick,
                user: &user,
                host: &host,
            },
        );
        client.send_msg(
            &config.name,
            RplYourHost002 {
                client: &nick,
                servername: &config.name,
                version: VERSION_STR,
            },
        );
        client.send_msg(
            &config.name,
            RplCreated003 {
                client: &nick,
                datetime: &self.created,
            },
        );
        client.send_msg(
            &config.name,
            RplMyInfo004 {
                client: &nick,
                servername: &config.name,
                version: VERSION_STR,
                avail_user_modes: "iow",
                avail_chmodes: "ikmnst",
            },
        );
        self.send_lusers(client);
        self.send_motd(client);
        info!("User {} registered from {}", client.source(), client.addr);
    }

    pub(crate) fn send_motd(&self, client: &Arc<Client>) {
        let display = client.display_name();
        match self.config.motd {
            Some(ref lines) if !lines.is_empty() => {
                client.send_msg(
                    &self.config.name,
                    RplMotdStart375 {
                        client: &display,
                        server: &self.config.name,
                    },
                );
                for line in lines {
                    client.send_msg(
                        &self.config.name,
                        RplMotd372 {
                            client: &display,
                            motd: line,
                        },
                    );
                }
                client.send_msg(&self.config.name, RplEndOfMotd376 { client: &display });
            }
            _ => {
                client.send_msg(&self.config.name, ErrNoMotd422 { client: &display });
            }
        }
    }

    pub(crate) fn send_lusers(&self, client: &Arc<Client>) {
        let display = client.display_name();
        let clients = self.clients.all();
        let users_num = clients.iter().filter(|c| c.is_registered()).count();
        let inv_users_num = clients
            .iter()
            .filter(|c| c.state().modes.contains(UserMode::Invisible))
            .count();
        let ops_num = clients
            .iter()
            .filter(|c| c.state().modes.contains(UserMode::Oper))
            .count();
        let conns_num = clients.len() - users_num;
        client.send_msg(
            &self.config.name,
            RplLUserClient251 {
                client: &display,
                users_num,
                inv_users_num,
                servers_num: 1,
            },
        );
        client.send_msg(
            &self.config.name,
            RplLUserOp252 {
                client: &display,
                ops_num,
            },
        );
        client.send_msg(
            &self.config.name,
            RplLUserUnknown253 {
                client: &display,
                conns_num,
            },
        );
        client.send_msg(
            &self.config.name,
            RplLUserChannels254 {
                client: &display,
                channels_num: self.channels.len(),
            },
        );
        client.send_msg(
            &self.config.name,
            RplLUserMe255 {
                client: &display,
                clients_num: clients.len(),
                servers_num: 1,
            },
        );
    }

    /// Sends the 353/366 pair for one channel.
    pub(crate) fn send_names(&self, client: &Arc<Client>, channel: &Arc<Channel>) {
        let display = client.display_name();
        let symbol = if channel.state().modes.contains(ChannelMode::Secret) {
            "@"
        } else {
            "="
        };
        let mut entries = Vec::new();
        for (id, roles) in channel.members_snapshot() {
            if let Some(member) = self.clients.get(id) {
                if let Some(nick) = member.state().nick.clone() {
                    entries.push(format!("{}{}", role_prefix(roles), nick));
                }
            }
        }
        client.send_msg(
            &self.config.name,
            RplNameReply353 {
                client: &display,
                symbol,
                channel: &channel.name,
                replies: &entries.join(" "),
            },
        );
        client.send_msg(
            &self.config.name,
            RplEndOfNames366 {
                client: &display,
                channel: &channel.name,
            },
        );
    }

    /// Final teardown after all three connection workers finished. Runs
    /// exactly once per client: broadcasts QUIT to every shared channel,
    /// removes memberships, drops empty channels, removes the client.
    pub(crate) fn quit_cleanup(&self, client: &Arc<Client>) {
        let reason = client
            .quit_reason()
            .unwrap_or_else(|| "Connection closed".to_string());
        let line = format!(":{} QUIT :{}", client.source(), reason);
        for channel in self.channels.joined_by(client.id) {
            channel.remove_member(client.id);
            if channel.is_empty() {
                self.channels.remove(&channel.name);
                info!("Channel {} has been removed", channel.name);
            } else {
                self.broadcast_channel(&channel, &line, Some(client.id));
            }
        }
        self.clients.remove(client.id);
    }

    /// Stops the accept loop. Live connections wind down with their own
    /// worker teardown.
    pub(crate) fn shutdown(&self, reason: String) {
        if let Some(sender) = self.quit_sender.lock().take() {
            let _ = sender.send(reason);
        }
    }
}

/// Binds the listener and spawns the accept loop. Returns the shared
/// state, the loop handle and the bound address (useful with port 0).
pub(crate) async fn run_server(
    config: MainConfig,
) -> Result<(Arc<Server>, JoinHandle<()>, SocketAddr), Box<dyn Error>> {
    let listener = TcpListener::bind((config.listen, config.port)).await?;
    let local_addr = listener.local_addr()?;
    info!("Listening on {}", local_addr);
    let server = Arc::new(Server::new(config));
    let handle = tokio::spawn({
        let server = server.clone();
        async move {
            let mut quit_receiver = match server.quit_receiver.lock().take() {
                Some(receiver) => receiver,
                None => return,
            };
            loop {
                tokio::select! {
                    reason = &mut quit_receiver => {
                        if let Ok(reason) = reason {
                            info!("Server shutdown: {}", reason);
                        }
                        break;
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, addr)) => {
                                tokio::spawn(conn::peer_session(
                                        server.clone(), stream, addr));
                            }
                            Err(e) => {
                                error!("Accept error: {}", e);
                            }
                        }
                    }
                }
            }
        }
    });
    Ok((server, handle, local_addr))
}
