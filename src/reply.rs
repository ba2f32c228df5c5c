// reply.rs - numeric reply catalog
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

use std::fmt;

/// Every numeric this server emits. Serialized without the server-name
/// source; the sender prepends `:<servername> `.
#[derive(Clone, Debug)]
pub(crate) enum Reply<'a> {
    RplWelcome001 {
        client: &'a str,
        networkname: &'a str,
        nick: &'a str,
        user: &'a str,
        host: &'a str,
    },
    RplYourHost002 {
        client: &'a str,
        servername: &'a str,
        version: &'a str,
    },
    RplCreated003 {
        client: &'a str,
        datetime: &'a str,
    },
    RplMyInfo004 {
        client: &'a str,
        servername: &'a str,
        version: &'a str,
        avail_user_modes: &'a str,
        avail_chmodes: &'a str,
    },
    RplUModeIs221 {
        client: &'a str,
        user_modes: &'a str,
    },
    RplLUserClient251 {
        client: &'a str,
        users_num: usize,
        inv_users_num: usize,
        servers_num: usize,
    },
    RplLUserOp252 {
        client: &'a str,
        ops_num: usize,
    },
    RplLUserUnknown253 {
        client: &'a str,
        conns_num: usize,
    },
    RplLUserChannels254 {
        client: &'a str,
        channels_num: usize,
    },
    RplLUserMe255 {
        client: &'a str,
        clients_num: usize,
        servers_num: usize,
    },
    RplAway301 {
        client: &'a str,
        nick: &'a str,
        message: &'a str,
    },
    RplUnAway305 {
        client: &'a str,
    },
    RplNowAway306 {
        client: &'a str,
    },
    RplWhoIsUser311 {
        client: &'a str,
        nick: &'a str,
        username: &'a str,
        host: &'a str,
        realname: &'a str,
    },
    RplWhoIsServer312 {
        client: &'a str,
        nick: &'a str,
        server: &'a str,
        server_info: &'a str,
    },
    RplWhoIsOperator313 {
        client: &'a str,
        nick: &'a str,
    },
    RplEndOfWho315 {
        client: &'a str,
        mask: &'a str,
    },
    RplEndOfWhoIs318 {
        client: &'a str,
        nick: &'a str,
    },
    RplWhoIsChannels319 {
        client: &'a str,
        nick: &'a str,
        channels: &'a str,
    },
    RplListStart321 {
        client: &'a str,
    },
    RplList322 {
        client: &'a str,
        channel: &'a str,
        client_count: usize,
        topic: &'a str,
    },
    RplListEnd323 {
        client: &'a str,
    },
    RplChannelModeIs324 {
        client: &'a str,
        channel: &'a str,
        modestring: &'a str,
    },
    RplCreationTime329 {
        client: &'a str,
        channel: &'a str,
        creation_time: u64,
    },
    RplNoTopic331 {
        client: &'a str,
        channel: &'a str,
    },
    RplTopic332 {
        client: &'a str,
        channel: &'a str,
        topic: &'a str,
    },
    RplTopicWhoTime333 {
        client: &'a str,
        channel: &'a str,
        nick: &'a str,
        setat: u64,
    },
    RplInviting341 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    RplVersion351 {
        client: &'a str,
        version: &'a str,
        server: &'a str,
        comments: &'a str,
    },
    RplWhoReply352 {
        client: &'a str,
        channel: &'a str,
        username: &'a str,
        host: &'a str,
        server: &'a str,
        nick: &'a str,
        flags: &'a str,
        realname: &'a str,
    },
    RplNameReply353 {
        client: &'a str,
        symbol: &'a str,
        channel: &'a str,
        replies: &'a str,
    },
    RplEndOfNames366 {
        client: &'a str,
        channel: &'a str,
    },
    RplMotd372 {
        client: &'a str,
        motd: &'a str,
    },
    RplMotdStart375 {
        client: &'a str,
        server: &'a str,
    },
    RplEndOfMotd376 {
        client: &'a str,
    },
    RplYoureOper381 {
        client: &'a str,
    },
    ErrNoSuchNick401 {
        client: &'a str,
        nick: &'a str,
    },
    ErrNoSuchChannel403 {
        client: &'a str,
        channel: &'a str,
    },
    ErrCannotSendToChan404 {
        client: &'a str,
        channel: &'a str,
    },
    ErrNoOrigin409 {
        client: &'a str,
    },
    ErrNoRecipient411 {
        client: &'a str,
        command: &'a str,
    },
    ErrNoTextToSend412 {
        client: &'a str,
    },
    ErrInputTooLong417 {
        client: &'a str,
    },
    ErrUnknownCommand421 {
        client: &'a str,
        command: &'a str,
    },
    ErrNoMotd422 {
        client: &'a str,
    },
    ErrErroneusNickname432 {
        client: &'a str,
        nick: &'a str,
    },
    ErrNicknameInUse433 {
        client: &'a str,
        nick: &'a str,
    },
    ErrUserNotInChannel441 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    ErrNotOnChannel442 {
        client: &'a str,
        channel: &'a str,
    },
    ErrUserOnChannel443 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    ErrNotRegistered451 {
        client: &'a str,
    },
    ErrNeedMoreParams461 {
        client: &'a str,
        command: &'a str,
    },
    ErrAlreadyRegistered462 {
        client: &'a str,
    },
    ErrPasswdMismatch464 {
        client: &'a str,
    },
    ErrUnknownMode472 {
        client: &'a str,
        modechar: char,
    },
    ErrInviteOnlyChan473 {
        client: &'a str,
        channel: &'a str,
    },
    ErrBadChannelKey475 {
        client: &'a str,
        channel: &'a str,
    },
    ErrChanOpPrivsNeeded482 {
        client: &'a str,
        channel: &'a str,
    },
    ErrNoOperHost491 {
        client: &'a str,
    },
    ErrUmodeUnknownFlag501 {
        client: &'a str,
    },
    ErrUsersDontMatch502 {
        client: &'a str,
    },
}

use Reply::*;

impl<'a> fmt::Display for Reply<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RplWelcome001 {
                client,
                networkname,
                nick,
                user,
                host,
            } => write!(
                f,
                "001 {} :Welcome to the {} Network, {}!~{}@{}",
                client, networkname, nick, user, host
            ),
            RplYourHost002 {
                client,
                servername,
                version,
            } => write!(
                f,
                "002 {} :Your host is {}, running version {}",
                client, servername, version
            ),
            RplCreated003 { client, datetime } => write!(
                f,
                "003 {} :This server was created {}",
                client, datetime
            ),
            RplMyInfo004 {
                client,
                servername,
                version,
                avail_user_modes,
                avail_chmodes,
            } => write!(
                f,
                "004 {} {} {} {} {}",
                client, servername, version, avail_user_modes, avail_chmodes
            ),
            RplUModeIs221 { client, user_modes } => {
                write!(f, "221 {} {}", client, user_modes)
            }
            RplLUserClient251 {
                client,
                users_num,
                inv_users_num,
                servers_num,
            } => write!(
                f,
                "251 {} :There are {} users and {} invisible on {} servers",
                client, users_num, inv_users_num, servers_num
            ),
            RplLUserOp252 { client, ops_num } => {
                write!(f, "252 {} {} :operator(s) online", client, ops_num)
            }
            RplLUserUnknown253 { client, conns_num } => {
                write!(f, "253 {} {} :unknown connection(s)", client, conns_num)
            }
            RplLUserChannels254 {
                client,
                channels_num,
            } => write!(f, "254 {} {} :channels formed", client, channels_num),
            RplLUserMe255 {
                client,
                clients_num,
                servers_num,
            } => write!(
                f,
                "255 {} :I have {} clients and {} servers",
                client, clients_num, servers_num
            ),
            RplAway301 {
                client,
                nick,
                message,
            } => write!(f, "301 {} {} :{}", client, nick, message),
            RplUnAway305 { client } => write!(
                f,
                "305 {} :You are no longer marked as being away",
                client
            ),
            RplNowAway306 { client } => {
                write!(f, "306 {} :You have been marked as being away", client)
            }
            RplWhoIsUser311 {
                client,
                nick,
                username,
                host,
                realname,
            } => write!(
                f,
                "311 {} {} ~{} {} * :{}",
                client, nick, username, host, realname
            ),
            RplWhoIsServer312 {
                client,
                nick,
                server,
                server_info,
            } => write!(f, "312 {} {} {} :{}", client, nick, server, server_info),
            RplWhoIsOperator313 { client, nick } => {
                write!(f, "313 {} {} :is an IRC operator", client, nick)
            }
            RplEndOfWho315 { client, mask } => {
                write!(f, "315 {} {} :End of WHO list", client, mask)
            }
            RplEndOfWhoIs318 { client, nick } => {
                write!(f, "318 {} {} :End of /WHOIS list", client, nick)
            }
            RplWhoIsChannels319 {
                client,
                nick,
                channels,
            } => write!(f, "319 {} {} :{}", client, nick, channels),
            RplListStart321 { client } => {
                write!(f, "321 {} Channel :Users  Name", client)
            }
            RplList322 {
                client,
                channel,
                client_count,
                topic,
            } => write!(f, "322 {} {} {} :{}", client, channel, client_count, topic),
            RplListEnd323 { client } => write!(f, "323 {} :End of /LIST", client),
            RplChannelModeIs324 {
                client,
                channel,
                modestring,
            } => write!(f, "324 {} {} {}", client, channel, modestring),
            RplCreationTime329 {
                client,
                channel,
                creation_time,
            } => write!(f, "329 {} {} {}", client, channel, creation_time),
            RplNoTopic331 { client, channel } => {
                write!(f, "331 {} {} :No topic is set", client, channel)
            }
            RplTopic332 {
                client,
                channel,
                topic,
            } => write!(f, "332 {} {} :{}", client, channel, topic),
            RplTopicWhoTime333 {
                client,
                channel,
                nick,
                setat,
            } => write!(f, "333 {} {} {} {}", client, channel, nick, setat),
            RplInviting341 {
                client,
                nick,
                channel,
            } => write!(f, "341 {} {} {}", client, nick, channel),
            RplVersion351 {
                client,
                version,
                server,
                comments,
            } => write!(f, "351 {} {} {} :{}", client, version, server, comments),
            RplWhoReply352 {
                client,
                channel,
                username,
                host,
                server,
                nick,
                flags,
                realname,
            } => write!(
                f,
                "352 {} {} ~{} {} {} {} {} :0 {}",
                client, channel, username, host, server, nick, flags, realname
            ),
            RplNameReply353 {
                client,
                symbol,
                channel,
                replies,
            } => write!(f, "353 {} {} {} :{}", client, symbol, channel, replies),
            RplEndOfNames366 { client, channel } => {
                write!(f, "366 {} {} :End of /NAMES list", client, channel)
            }
            RplMotd372 { client, motd } => write!(f, "372 {} :{}", client, motd),
            RplMotdStart375 { client, server } => write!(
                f,
                "375 {} :- {} Message of the day - ",
                client, server
            ),
            RplEndOfMotd376 { client } => {
                write!(f, "376 {} :End of /MOTD command.", client)
            }
            RplYoureOper381 { client } => {
                write!(f, "381 {} :You are now an IRC operator", client)
            }
            ErrNoSuchNick401 { client, nick } => {
                write!(f, "401 {} {} :No such nick/channel", client, nick)
            }
            ErrNoSuchChannel403 { client, channel } => {
                write!(f, "403 {} {} :No such channel", client, channel)
            }
            ErrCannotSendToChan404 { client, channel } => {
                write!(f, "404 {} {} :Cannot send to channel", client, channel)
            }
            ErrNoOrigin409 { client } => write!(f, "409 {} :No origin specified", client),
            ErrNoRecipient411 { client, command } => {
                write!(f, "411 {} :No recipient given ({})", client, command)
            }
            ErrNoTextToSend412 { client } => {
                write!(f, "412 {} :No text to send", client)
            }
            ErrInputTooLong417 { client } => {
                write!(f, "417 {} :Input line was too long", client)
            }
            ErrUnknownCommand421 { client, command } => {
                write!(f, "421 {} {} :Unknown command", client, command)
            }
            ErrNoMotd422 { client } => write!(f, "422 {} :MOTD File is missing", client),
            ErrErroneusNickname432 { client, nick } => {
                write!(f, "432 {} {} :Erroneus nickname", client, nick)
            }
            ErrNicknameInUse433 { client, nick } => {
                write!(f, "433 {} {} :Nickname is already in use", client, nick)
            }
            ErrUserNotInChannel441 {
                client,
                nick,
                channel,
            } => write!(
                f,
                "441 {} {} {} :They aren't on that channel",
                client, nick, channel
            ),
            ErrNotOnChannel442 { client, channel } => {
                write!(f, "442 {} {} :You're not on that channel", client, channel)
            }
            ErrUserOnChannel443 {
                client,
                nick,
                channel,
            } => write!(f, "443 {} {} {} :is already on channel", client, nick, channel),
            ErrNotRegistered451 { client } => {
                write!(f, "451 {} :You have not registered", client)
            }
            ErrNeedMoreParams461 { client, command } => {
                write!(f, "461 {} {} :Not enough parameters", client, command)
            }
            ErrAlreadyRegistered462 { client } => {
                write!(f, "462 {} :You may not reregister", client)
            }
            ErrPasswdMismatch464 { client } => {
                write!(f, "464 {} :Password incorrect", client)
            }
            ErrUnknownMode472 { client, modechar } => {
                write!(f, "472 {} {} :is unknown mode char to me", client, modechar)
            }
            ErrInviteOnlyChan473 { client, channel } => {
                write!(f, "473 {} {} :Cannot join channel (+i)", client, channel)
            }
            ErrBadChannelKey475 { client, channel } => {
                write!(f, "475 {} {} :Cannot join channel (+k)", client, channel)
            }
            ErrChanOpPrivsNeeded482 { client, channel } => {
                write!(f, "482 {} {} :You're not channel operator", client, channel)
            }
            ErrNoOperHost491 { client } => {
                write!(f, "491 {} :No O-lines for your host", client)
            }
            ErrUmodeUnknownFlag501 { client } => {
                write!(f, "501 {} :Unknown MODE flag", client)
            }
            ErrUsersDontMatch502 { client } => {
                write!(f, "502 {} :Cant change mode for other users", client)
            }
        }
    }
}
