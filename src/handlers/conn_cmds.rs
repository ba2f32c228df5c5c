// conn_cmds.rs - connection and registration commands
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

use std::collections::HashSet;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use tracing::*;

use crate::config::validate_nickname;
use crate::mask::Mask;
use crate::modes::UserMode;
use crate::reply::Reply::*;
use crate::router::{Context, Handler, HandlerResult};

pub(crate) struct PassHandler;

#[async_trait]
impl Handler for PassHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.client.is_registered() {
            ctx.reply(ErrAlreadyRegistered462 {
                client: &ctx.client.display_name(),
            });
            return Ok(());
        }
        ctx.client.state_mut().password = Some(ctx.msg.params[0].to_string());
        Ok(())
    }
}

pub(crate) struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let nick = ctx.msg.params[0];
        if validate_nickname(nick).is_err() || nick.len() > ctx.server.config.max_nickname_len {
            ctx.reply(ErrErroneusNickname432 {
                client: &ctx.client.display_name(),
                nick,
            });
            return Ok(());
        }
        if let Some(holder) = ctx.server.clients.find_by_nick(nick) {
            if holder.id != ctx.client.id {
                ctx.reply(ErrNicknameInUse433 {
                    client: &ctx.client.display_name(),
                    nick,
                });
            }
            return Ok(());
        }

        let old_source = ctx.client.source();
        let was_registered = ctx.client.is_registered();
        ctx.client.state_mut().nick = Some(nick.to_string());

        if was_registered {
            // tell the user and every channel peer, each peer once
            let line = format!(":{} NICK :{}", old_source, nick);
            let mut seen = HashSet::new();
            seen.insert(ctx.client.id);
            ctx.client.send_line(line.clone());
            for channel in ctx.server.channels.joined_by(ctx.client.id) {
                for id in channel.member_ids() {
                    if seen.insert(id) {
                        if let Some(peer) = ctx.server.clients.get(id) {
                            peer.send_line(line.clone());
                        }
                    }
                }
            }
        } else {
            ctx.server.try_complete_registration(ctx.client);
        }
        Ok(())
    }
}

pub(crate) struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.client.is_registered() {
            ctx.reply(ErrAlreadyRegistered462 {
                client: &ctx.client.display_name(),
            });
            return Ok(());
        }
        {
            let mut state = ctx.client.state_mut();
            state.username = Some(ctx.msg.params[0].to_string());
            state.realname = Some(ctx.msg.params[3].to_string());
        }
        ctx.server.try_complete_registration(ctx.client);
        Ok(())
    }
}

pub(crate) struct OperHandler;

#[async_trait]
impl Handler for OperHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        let entry = ctx
            .server
            .config
            .operators
            .as_ref()
            .and_then(|opers| opers.iter().find(|o| o.name == ctx.msg.params[0]));
        let entry = match entry {
            Some(entry) => entry,
            None => {
                ctx.reply(ErrNoOperHost491 { client: &display });
                return Ok(());
            }
        };
        if let Some(ref mask_text) = entry.mask {
            let matched = Mask::compile(mask_text)
                .map(|mask| mask.matches(&ctx.client.source()))
                .unwrap_or(false);
            if !matched {
                ctx.reply(ErrNoOperHost491 { client: &display });
                return Ok(());
            }
        }
        let verified = PasswordHash::new(&entry.password)
            .map(|hash| {
                Argon2::default()
                    .verify_password(ctx.msg.params[1].as_bytes(), &hash)
                    .is_ok()
            })
            .unwrap_or(false);
        if !verified {
            ctx.reply(ErrPasswdMismatch464 { client: &display });
            return Ok(());
        }
        ctx.client.state_mut().modes |= UserMode::Oper;
        ctx.reply(RplYoureOper381 { client: &display });
        info!("New IRC operator {}", ctx.client.source());
        Ok(())
    }
}

pub(crate) struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let reason = ctx
            .msg
            .params
            .first()
            .map(|text| format!("Quit: {}", text))
            .unwrap_or_else(|| "Client Quit".to_string());
        ctx.client.kill(&reason);
        Ok(())
    }
}

pub(crate) struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        match ctx.msg.params.first() {
            Some(token) => {
                let name = &ctx.server.config.name;
                ctx.client
                    .send_line(format!(":{} PONG {} :{}", name, name, token));
            }
            None => {
                ctx.reply(ErrNoOrigin409 {
                    client: &ctx.client.display_name(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) struct PongHandler;

#[async_trait]
impl Handler for PongHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.client.pong_notify.notify_one();
        Ok(())
    }
}
