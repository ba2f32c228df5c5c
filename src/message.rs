// message.rs - wire message parser
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
use std::fmt;

// maximum line length after the caller stripped CR/LF.
pub(crate) const MAX_MESSAGE_LEN: usize = 510;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MessageError {
    TooLong,
    MalformedTags,
    NoCommand,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::TooLong => write!(f, "Message is too long"),
            MessageError::MalformedTags => write!(f, "Malformed tag block"),
            MessageError::NoCommand => write!(f, "No command"),
        }
    }
}

impl Error for MessageError {}

/// One parsed wire line. All text except the upper-cased command is
/// borrowed from the input line.
#[derive(Default, Debug, PartialEq, Eq)]
pub(crate) struct Message<'a> {
    pub(crate) tags: Vec<(&'a str, Option<&'a str>)>,
    pub(crate) prefix: Option<&'a str>,
    pub(crate) command: String,
    pub(crate) params: Vec<&'a str>,
}

impl<'a> Message<'a> {
    pub(crate) fn tag(&self, key: &str) -> Option<&'a str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| *v)
    }
}

/// Parses one line with CR/LF already stripped. An empty line parses to an
/// empty message (command is ""), which the caller treats as a no-op.
pub(crate) fn parse(line: &str) -> Result<Message<'_>, MessageError> {
    if line.len() > MAX_MESSAGE_LEN {
        return Err(MessageError::TooLong);
    }
    if line.is_empty() {
        return Ok(Message::default());
    }

    let mut rest = line;
    let mut tags = Vec::new();
    if let Some(tag_block) = rest.strip_prefix('@') {
        let sp = tag_block.find(' ').ok_or(MessageError::MalformedTags)?;
        for item in tag_block[..sp].split(';') {
            if item.is_empty() {
                continue;
            }
            match item.split_once('=') {
                Some((key, value)) => tags.push((key, Some(value))),
                None => tags.push((item, None)),
            }
        }
        rest = &tag_block[sp + 1..];
    }

    rest = rest.trim_start_matches(' ');
    let mut prefix = None;
    if let Some(after) = rest.strip_prefix(':') {
        match after.split_once(' ') {
            Some((p, r)) => {
                prefix = Some(p);
                rest = r.trim_start_matches(' ');
            }
            None => {
                prefix = Some(after);
                rest = "";
            }
        }
    }

    let (command, mut rest) = match rest.split_once(' ') {
        Some((c, r)) => (c, r),
        None => (rest, ""),
    };
    if command.is_empty() {
        return Err(MessageError::NoCommand);
    }

    let mut params = Vec::new();
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }
        match rest.split_once(' ') {
            Some((param, r)) => {
                params.push(param);
                rest = r;
            }
            None => {
                params.push(rest);
                break;
            }
        }
    }

    Ok(Message {
        tags,
        prefix,
        command: command.to_ascii_uppercase(),
        params,
    })
}

impl<'a> fmt::Display for Message<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        if let Some((last, init)) = self.params.split_last() {
            for param in init {
                write!(f, " {}", param)?;
            }
            if last.is_empty() || last.starts_with(':') || last.contains(' ') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let msg = parse("PING").unwrap();
        assert_eq!("PING", msg.command);
        assert_eq!(Vec::<&str>::new(), msg.params);
        assert_eq!(None, msg.prefix);

        let msg = parse("PING 12345").unwrap();
        assert_eq!("PING", msg.command);
        assert_eq!(vec!["12345"], msg.params);
    }

    #[test]
    fn test_parse_prefix_and_trailing() {
        let msg = parse(":a!b@c PRIVMSG #x :hello there").unwrap();
        assert_eq!(Some("a!b@c"), msg.prefix);
        assert_eq!("PRIVMSG", msg.command);
        assert_eq!(vec!["#x", "hello there"], msg.params);
    }

    #[test]
    fn test_parse_command_case() {
        let msg = parse("privmsg bob :hi").unwrap();
        assert_eq!("PRIVMSG", msg.command);
        assert_eq!(vec!["bob", "hi"], msg.params);
    }

    #[test]
    fn test_parse_empty_line() {
        let msg = parse("").unwrap();
        assert_eq!("", msg.command);
        assert!(msg.params.is_empty());
        assert!(msg.tags.is_empty());
    }

    #[test]
    fn test_parse_whitespace_only() {
        assert_eq!(Err(MessageError::NoCommand), parse("   "));
    }

    #[test]
    fn test_parse_too_long() {
        let line = format!("PRIVMSG #chan :{}", "x".repeat(600));
        assert_eq!(Err(MessageError::TooLong), parse(&line));
        // exactly at the limit is fine
        let line = format!("PRIVMSG #chan :{}", "x".repeat(MAX_MESSAGE_LEN - 15));
        assert_eq!(MAX_MESSAGE_LEN, line.len());
        assert!(parse(&line).is_ok());
    }

    #[test]
    fn test_parse_tags() {
        let msg = parse("@time=2022-01-01T00:00:00Z;tagonly PRIVMSG #x :hi").unwrap();
        assert_eq!(
            vec![
                ("time", Some("2022-01-01T00:00:00Z")),
                ("tagonly", None)
            ],
            msg.tags
        );
        assert_eq!(Some("2022-01-01T00:00:00Z"), msg.tag("time"));
        assert_eq!(None, msg.tag("tagonly"));
        assert_eq!("PRIVMSG", msg.command);
        assert_eq!(vec!["#x", "hi"], msg.params);
    }

    #[test]
    fn test_parse_malformed_tags() {
        assert_eq!(Err(MessageError::MalformedTags), parse("@time=now"));
        assert_eq!(Err(MessageError::MalformedTags), parse("@"));
    }

    #[test]
    fn test_parse_no_command() {
        assert_eq!(Err(MessageError::NoCommand), parse(":prefix.only"));
        assert_eq!(Err(MessageError::NoCommand), parse(":prefix.only   "));
    }

    #[test]
    fn test_parse_space_runs() {
        let msg = parse(":src   JOIN    #a   #b").unwrap();
        assert_eq!(Some("src"), msg.prefix);
        assert_eq!("JOIN", msg.command);
        assert_eq!(vec!["#a", "#b"], msg.params);
    }

    #[test]
    fn test_parse_trailing_keeps_spaces() {
        let msg = parse("TOPIC #x :  padded  topic ").unwrap();
        assert_eq!(vec!["#x", "  padded  topic "], msg.params);
    }

    #[test]
    fn test_roundtrip_semantic() {
        for line in [
            "PING",
            "PING 12345",
            ":a!b@c PRIVMSG #x :hello there",
            "JOIN #a,#b key1,key2",
            "MODE #chan +ov alice bob",
            "QUIT :bye for now",
        ] {
            let msg = parse(line).unwrap();
            let rendered = msg.to_string();
            let reparsed = parse(&rendered).unwrap();
            assert_eq!(msg.command, reparsed.command, "line: {}", line);
            assert_eq!(msg.params, reparsed.params, "line: {}", line);
            assert_eq!(msg.prefix, reparsed.prefix, "line: {}", line);
        }
    }
}
