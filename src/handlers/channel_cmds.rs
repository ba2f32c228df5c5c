// channel_cmds.rs - channel membership and mode commands
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
use flagset::FlagSet;
use tracing::*;

use crate::channel::Channel;
use crate::config::validate_channel;
use crate::modes::{
    is_chan_operator, is_half_operator, ChannelMode, UserMode, CHANNEL_MODES, MEMBER_ROLES,
    USER_MODES,
};
use crate::reply::Reply::*;
use crate::router::{Context, Handler, HandlerResult};

fn is_channel_name(name: &str) -> bool {
    name.starts_with('#') || name.starts_with('&')
}

pub(crate) struct JoinHandler;

enum JoinDenied {
    InviteOnly,
    BadKey,
}

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        let names: Vec<&str> = ctx.msg.params[0]
            .split(',')
            .filter(|n| !n.is_empty())
            .collect();
        let keys: Vec<&str> = ctx
            .msg
            .params
            .get(1)
            .map(|k| k.split(',').collect())
            .unwrap_or_default();

        for (i, name) in names.iter().enumerate() {
            if validate_channel(name).is_err() {
                ctx.reply(ErrNoSuchChannel403 {
                    client: &display,
                    channel: name,
                });
                continue;
            }
            let channel = match ctx.server.channels.get(name) {
                Some(channel) => {
                    if channel.has_member(ctx.client.id) {
                        continue;
                    }
                    let denied = {
                        let mut state = channel.state_mut();
                        let invited = state.invites.contains(&ctx.client.id);
                        if state.modes.contains(ChannelMode::InviteOnly) && !invited {
                            Some(JoinDenied::InviteOnly)
                        } else if state.key.is_some()
                            && keys.get(i).copied() != state.key.as_deref()
                        {
                            Some(JoinDenied::BadKey)
                        } else {
                            // invites are single-use
                            state.invites.remove(&ctx.client.id);
                            state.members.insert(ctx.client.id, FlagSet::default());
                            None
                        }
                    };
                    match denied {
                        Some(JoinDenied::InviteOnly) => {
                            ctx.reply(ErrInviteOnlyChan473 {
                                client: &display,
                                channel: name,
                            });
                            continue;
                        }
                        Some(JoinDenied::BadKey) => {
                            ctx.reply(ErrBadChannelKey475 {
                                client: &display,
                                channel: name,
                            });
                            continue;
                        }
                        None => channel,
                    }
                }
                None => {
                    let channel =
                        Arc::new(Channel::new_on_join(name.to_string(), ctx.client.id));
                    ctx.server.channels.add(channel.clone());
                    info!("Channel {} created by {}", name, ctx.client.source());
                    channel
                }
            };

            let line = format!(":{} JOIN :{}", ctx.client.source(), channel.name);
            ctx.server.broadcast_channel(&channel, &line, None);
            match channel.topic() {
                Some(topic) => {
                    ctx.reply(RplTopic332 {
                        client: &display,
                        channel: &channel.name,
                        topic: &topic.text,
                    });
                    ctx.reply(RplTopicWhoTime333 {
                        client: &display,
                        channel: &channel.name,
                        nick: &topic.nick,
                        setat: topic.set_at,
                    });
                }
                None => {
                    ctx.reply(RplNoTopic331 {
                        client: &display,
                        channel: &channel.name,
                    });
                }
            }
            ctx.server.send_names(ctx.client, &channel);
        }
        Ok(())
    }
}

pub(crate) struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        let reason = ctx.msg.params.get(1).copied().unwrap_or("");
        for name in ctx.msg.params[0].split(',').filter(|n| !n.is_empty()) {
            let channel = match ctx.server.channels.get(name) {
                Some(channel) => channel,
                None => {
                    ctx.reply(ErrNoSuchChannel403 {
                        client: &display,
                        channel: name,
                    });
                    continue;
                }
            };
            if !channel.has_member(ctx.client.id) {
                ctx.reply(ErrNotOnChannel442 {
                    client: &display,
                    channel: name,
                });
                continue;
            }
            let line = if reason.is_empty() {
                format!(":{} PART {}", ctx.client.source(), channel.name)
            } else {
                format!(":{} PART {} :{}", ctx.client.source(), channel.name, reason)
            };
            ctx.server.broadcast_channel(&channel, &line, None);
            channel.remove_member(ctx.client.id);
            if channel.is_empty() {
                ctx.server.channels.remove(&channel.name);
                info!("Channel {} has been removed", channel.name);
            }
        }
        Ok(())
    }
}

pub(crate) struct TopicHandler;

#[async_trait]
impl Handler for TopicHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        let name = ctx.msg.params[0];
        let channel = match ctx.server.channels.get(name) {
            Some(channel) => channel,
            None => {
                ctx.reply(ErrNoSuchChannel403 {
                    client: &display,
                    channel: name,
                });
                return Ok(());
            }
        };
        if !channel.has_member(ctx.client.id) {
            ctx.reply(ErrNotOnChannel442 {
                client: &display,
                channel: name,
            });
            return Ok(());
        }
        match ctx.msg.params.get(1) {
            None => match channel.topic() {
                Some(topic) => {
                    ctx.reply(RplTopic332 {
                        client: &display,
                        channel: name,
                        topic: &topic.text,
                    });
                    ctx.reply(RplTopicWhoTime333 {
                        client: &display,
                        channel: name,
                        nick: &topic.nick,
                        setat: topic.set_at,
                    });
                }
                None => {
                    ctx.reply(RplNoTopic331 {
                        client: &display,
                        channel: name,
                    });
                }
            },
            Some(text) => {
                let locked = channel.state().modes.contains(ChannelMode::TopicLock);
                let roles = channel.roles_of(ctx.client.id).unwrap_or_default();
                if locked && !is_half_operator(roles) {
                    ctx.reply(ErrChanOpPrivsNeeded482 {
                        client: &display,
                        channel: name,
                    });
                    return Ok(());
                }
                channel.set_topic(text, &display);
                let line = format!(":{} TOPIC {} :{}", ctx.client.source(), name, text);
                ctx.server.broadcast_channel(&channel, &line, None);
            }
        }
        Ok(())
    }
}

pub(crate) struct NamesHandler;

#[async_trait]
impl Handler for NamesHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        match ctx.msg.params.first() {
            Some(list) => {
                for name in list.split(',').filter(|n| !n.is_empty()) {
                    match ctx.server.channels.get(name) {
                        Some(channel) if channel.is_visible_to(ctx.client.id) => {
                            ctx.server.send_names(ctx.client, &channel);
                        }
                        _ => {
                            ctx.reply(RplEndOfNames366 {
                                client: &display,
                                channel: name,
                            });
                        }
                    }
                }
            }
            None => {
                for channel in ctx.server.channels.all() {
                    if channel.is_visible_to(ctx.client.id) {
                        ctx.server.send_names(ctx.client, &channel);
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) struct ListHandler;

#[async_trait]
impl Handler for ListHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        ctx.reply(RplListStart321 { client: &display });
        let channels = match ctx.msg.params.first() {
            Some(list) => list
                .split(',')
                .filter(|n| !n.is_empty())
                .filter_map(|n| ctx.server.channels.get(n))
                .collect(),
            None => ctx.server.channels.all(),
        };
        for channel in channels {
            if !channel.is_visible_to(ctx.client.id) {
                continue;
            }
            let topic = channel
                .topic()
                .map(|t| t.text)
                .unwrap_or_default();
            ctx.reply(RplList322 {
                client: &display,
                channel: &channel.name,
                client_count: channel.member_count(),
                topic: &topic,
            });
        }
        ctx.reply(RplListEnd323 { client: &display });
        Ok(())
    }
}

pub(crate) struct InviteHandler;

#[async_trait]
impl Handler for InviteHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        let nick = ctx.msg.params[0];
        let name = ctx.msg.params[1];
        let channel = match ctx.server.channels.get(name) {
            Some(channel) => channel,
            None => {
                ctx.reply(ErrNoSuchChannel403 {
                    client: &display,
                    channel: name,
                });
                return Ok(());
            }
        };
        if !channel.has_member(ctx.client.id) {
            ctx.reply(ErrNotOnChannel442 {
                client: &display,
                channel: name,
            });
            return Ok(());
        }
        let target = match ctx.server.clients.find_by_nick(nick) {
            Some(target) => target,
            None => {
                ctx.reply(ErrNoSuchNick401 {
                    client: &display,
                    nick,
                });
                return Ok(());
            }
        };
        if channel.has_member(target.id) {
            ctx.reply(ErrUserOnChannel443 {
                client: &display,
                nick,
                channel: name,
            });
            return Ok(());
        }
        // on invite-only channels only operators may invite
        let roles = channel.roles_of(ctx.client.id).unwrap_or_default();
        if channel.state().modes.contains(ChannelMode::InviteOnly) && !is_chan_operator(roles) {
            ctx.reply(ErrChanOpPrivsNeeded482 {
                client: &display,
                channel: name,
            });
            return Ok(());
        }
        channel.state_mut().invites.insert(target.id);
        ctx.reply(RplInviting341 {
            client: &display,
            nick,
            channel: name,
        });
        target.send_line(format!(":{} INVITE {} :{}", ctx.client.source(), nick, name));
        Ok(())
    }
}

pub(crate) struct KickHandler;

#[async_trait]
impl Handler for KickHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let display = ctx.client.display_name();
        let name = ctx.msg.params[0];
        let nick = ctx.msg.params[1];
        let channel = match ctx.server.channels.get(name) {
            Some(channel) => channel,
            None => {
                ctx.reply(ErrNoSuchChannel403 {
                    client: &display,
                    channel: name,
                });
                return Ok(());
            }
        };
        if !channel.has_member(ctx.client.id) {
            ctx.reply(ErrNotOnChannel442 {
                client: &display,
                channel: name,
            });
            return Ok(());
        }
        let my_roles = channel.roles_of(ctx.client.id).unwrap_or_default();
        if !is_chan_operator(my_roles) {
            ctx.reply(ErrChanOpPrivsNeeded482 {
                client: &display,
                channel: name,
            });
            return Ok(());
        }
        let target = match ctx.server.clients.find_by_nick(nick) {
            Some(target) => target,
            None => {
                ctx.reply(ErrNoSuchNick401 {
                    client: &display,
                    nick,
                });
                return Ok(());
            }
        };
        let target_roles = match channel.roles_of(target.id) {
            Some(roles) => roles,
            None => {
                ctx.reply(ErrUserNotInChannel441 {
                    client: &display,
                    nick,
                    channel: name,
                });
                return Ok(());
            }
        };
        // owners and admins are protected from plain operators
        if (target_roles.contains(crate::modes::MemberRole::Owner)
            || target_roles.contains(crate::modes::MemberRole::Admin))
            && !my_roles.contains(crate::modes::MemberRole::Owner)
        {
            ctx.reply(ErrChanOpPrivsNeeded482 {
                client: &display,
                channel: name,
            });
            return Ok(());
        }
        let comment = ctx.msg.params.get(2).copied().unwrap_or(&display);
        let line = format!(
            ":{} KICK {} {} :{}",
            ctx.client.source(),
            name,
            nick,
            comment
        );
        ctx.server.broadcast_channel(&channel, &line, None);
        channel.remove_member(target.id);
        if channel.is_empty() {
            ctx.server.channels.remove(&channel.name);
            info!("Channel {} has been removed", channel.name);
        }
        Ok(())
    }
}

pub(crate) struct ModeHandler;

#[async_trait]
impl Handler for ModeHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if is_channel_name(ctx.msg.params[0]) {
            channel_mode(ctx)
        } else {
            user_mode(ctx)
        }
        Ok(())
    }
}

fn sign(adding: bool) -> char {
    if adding {
        '+'
    } else {
        '-'
    }
}

fn user_mode(ctx: &Context<'_>) {
    let display = ctx.client.display_name();
    let target = ctx.msg.params[0];
    if Some(target) != ctx.client.state().nick.as_deref() {
        if ctx.server.clients.find_by_nick(target).is_some() {
            ctx.reply(ErrUsersDontMatch502 { client: &display });
        } else {
            ctx.reply(ErrNoSuchNick401 {
                client: &display,
                nick: target,
            });
        }
        return;
    }
    if ctx.msg.params.len() == 1 {
        let modes = ctx.client.state().modes;
        ctx.reply(RplUModeIs221 {
            client: &display,
            user_modes: &USER_MODES.mode_string(modes),
        });
        return;
    }

    let before = ctx.client.state().modes;
    let mut after = before;
    let mut unknown = false;
    for text in &ctx.msg.params[1..] {
        unknown |= text
            .chars()
            .any(|c| c != '+' && c != '-' && USER_MODES.flag(c).is_none());
        let (to_add, to_remove) = USER_MODES.parse_mode_string(text);
        for flag in to_add {
            // operator status is only granted through OPER
            if flag != UserMode::Oper {
                after |= flag;
            }
        }
        for flag in to_remove {
            after &= !flag;
        }
    }
    if unknown {
        ctx.reply(ErrUmodeUnknownFlag501 { client: &display });
    }
    if after != before {
        ctx.client.state_mut().modes = after;
        let (added, removed) = USER_MODES.diff(before, after);
        let mut changes = String::new();
        if !added.is_empty() {
            changes.push('+');
            for flag in added {
                changes.extend(USER_MODES.letter(flag));
            }
        }
        if !removed.is_empty() {
            changes.push('-');
            for flag in removed {
                changes.extend(USER_MODES.letter(flag));
            }
        }
        ctx.client
            .send_line(format!(":{} MODE {} {}", ctx.client.source(), display, changes));
    }
}

fn channel_mode(ctx: &Context<'_>) {
    let display = ctx.client.display_name();
    let name = ctx.msg.params[0];
    let channel = match ctx.server.channels.get(name) {
        Some(channel) => channel,
        None => {
            ctx.reply(ErrNoSuchChannel403 {
                client: &display,
                channel: name,
            });
            return;
        }
    };
    if ctx.msg.params.len() == 1 {
        let (modestring, creation_time) = {
            let state = channel.state();
            (CHANNEL_MODES.mode_string(state.modes), state.created_at)
        };
        ctx.reply(RplChannelModeIs324 {
            client: &display,
            channel: name,
            modestring: &modestring,
        });
        ctx.reply(RplCreationTime329 {
            client: &display,
            channel: name,
            creation_time,
        });
        return;
    }
    if !channel.has_member(ctx.client.id) {
        ctx.reply(ErrNotOnChannel442 {
            client: &display,
            channel: name,
        });
        return;
    }
    if !is_chan_operator(channel.roles_of(ctx.client.id).unwrap_or_default()) {
        ctx.reply(ErrChanOpPrivsNeeded482 {
            client: &display,
            channel: name,
        });
        return;
    }

    // (sign, letter, argument) per applied change, in order of
    // application. The first bad pair stops processing; what was already
    // applied stays and is still broadcast.
    let mut applied: Vec<(char, char, Option<String>)> = Vec::new();
    let mut args = ctx.msg.params[2..].iter();
    let mut adding = true;
    'modes: for c in ctx.msg.params[1].chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            _ => {
                if let Some(role) = MEMBER_ROLES.flag(c) {
                    let nick = match args.next() {
                        Some(nick) => *nick,
                        None => {
                            ctx.reply(ErrNeedMoreParams461 {
                                client: &display,
                                command: "MODE",
                            });
                            break 'modes;
                        }
                    };
                    let target = match ctx.server.clients.find_by_nick(nick) {
                        Some(target) => target,
                        None => {
                            ctx.reply(ErrNoSuchNick401 {
                                client: &display,
                                nick,
                            });
                            break 'modes;
                        }
                    };
                    if !channel.set_role(target.id, role, adding) {
                        ctx.reply(ErrUserNotInChannel441 {
                            client: &display,
                            nick,
                            channel: name,
                        });
                        break 'modes;
                    }
                    applied.push((sign(adding), c, Some(nick.to_string())));
                } else if c == 'k' {
                    if adding {
                        let key = match args.next() {
                            Some(key) => *key,
                            None => {
                                ctx.reply(ErrNeedMoreParams461 {
                                    client: &display,
                                    command: "MODE",
                                });
                                break 'modes;
                            }
                        };
                        {
                            let mut state = channel.state_mut();
                            state.key = Some(key.to_string());
                            state.modes |= ChannelMode::Key;
                        }
                        applied.push(('+', 'k', Some(key.to_string())));
                    } else {
                        {
                            let mut state = channel.state_mut();
                            state.key = None;
                            state.modes &= !ChannelMode::Key;
                        }
                        applied.push(('-', 'k', None));
                    }
                } else if let Some(flag) = CHANNEL_MODES.flag(c) {
                    {
                        let mut state = channel.state_mut();
                        if adding {
                            state.modes |= flag;
                        } else {
                            state.modes &= !flag;
                        }
                    }
                    applied.push((sign(adding), c, None));
                } else {
                    ctx.reply(ErrUnknownMode472 {
                        client: &display,
                        modechar: c,
                    });
                    break 'modes;
                }
            }
        }
    }

    if !applied.is_empty() {
        let mut letters = String::new();
        let mut mode_args = Vec::new();
        let mut current_sign = ' ';
        for (s, letter, arg) in &applied {
            if *s != current_sign {
                letters.push(*s);
                current_sign = *s;
            }
            letters.push(*letter);
            if let Some(arg) = arg {
                mode_args.push(arg.clone());
            }
        }
        let mut line = format!(":{} MODE {} {}", ctx.client.source(), name, letters);
        if !mode_args.is_empty() {
            line.push(' ');
            line.push_str(&mode_args.join(" "));
        }
        ctx.server.broadcast_channel(&channel, &line, None);
    }
}
