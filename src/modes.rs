// modes.rs - user/channel mode bitmasks and mode-string codec
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

use flagset::{flags, FlagSet};

flags! {
    pub(crate) enum UserMode: u8 {
        Invisible = 0b1,
        Oper = 0b10,
        Wallops = 0b100,
    }

    pub(crate) enum ChannelMode: u8 {
        InviteOnly = 0b1,
        Key = 0b10,
        Moderated = 0b100,
        NoExternal = 0b1000,
        Secret = 0b10000,
        TopicLock = 0b100000,
    }

    pub(crate) enum MemberRole: u8 {
        Admin = 0b1,
        HalfOp = 0b10,
        Op = 0b100,
        Owner = 0b1000,
        Voice = 0b10000,
    }
}

/// Letter <-> flag table for one mode universe. Entries are kept in
/// lexicographic letter order so rendered mode strings are stable.
pub(crate) struct ModeTable<T: flagset::Flags> {
    pairs: &'static [(char, T)],
}

impl<T: flagset::Flags + PartialEq> ModeTable<T> {
    pub(crate) const fn new(pairs: &'static [(char, T)]) -> ModeTable<T> {
        ModeTable { pairs }
    }

    pub(crate) fn flag(&self, letter: char) -> Option<T> {
        self.pairs
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|&(_, flag)| flag)
    }

    pub(crate) fn letter(&self, flag: T) -> Option<char> {
        self.pairs
            .iter()
            .find(|(_, f)| *f == flag)
            .map(|&(letter, _)| letter)
    }

    /// Splits a `+ab-cd` style string into (to_add, to_remove). A leading
    /// sign is optional and defaults to `+`. Unknown letters are skipped,
    /// duplicates are preserved in order.
    pub(crate) fn parse_mode_string(&self, text: &str) -> (Vec<T>, Vec<T>) {
        let mut to_add = Vec::new();
        let mut to_remove = Vec::new();
        let mut adding = true;
        for c in text.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                _ => {
                    if let Some(flag) = self.flag(c) {
                        if adding {
                            to_add.push(flag);
                        } else {
                            to_remove.push(flag);
                        }
                    }
                }
            }
        }
        (to_add, to_remove)
    }

    /// Flags present in `after` but not `before`, and vice versa, in table
    /// order.
    pub(crate) fn diff(&self, before: FlagSet<T>, after: FlagSet<T>) -> (Vec<T>, Vec<T>) {
        let mut added = Vec::new();
        let mut removed = Vec::new();
        for &(_, flag) in self.pairs {
            if after.contains(flag) && !before.contains(flag) {
                added.push(flag);
            }
            if before.contains(flag) && !after.contains(flag) {
                removed.push(flag);
            }
        }
        (added, removed)
    }

    /// Renders a set as `+<letters>` in table order. The empty set renders
    /// as a bare `+`.
    pub(crate) fn mode_string(&self, set: FlagSet<T>) -> String {
        let mut out = String::from("+");
        for &(letter, flag) in self.pairs {
            if set.contains(flag) {
                out.push(letter);
            }
        }
        out
    }
}

pub(crate) static USER_MODES: ModeTable<UserMode> = ModeTable::new(&[
    ('i', UserMode::Invisible),
    ('o', UserMode::Oper),
    ('w', UserMode::Wallops),
]);

pub(crate) static CHANNEL_MODES: ModeTable<ChannelMode> = ModeTable::new(&[
    ('i', ChannelMode::InviteOnly),
    ('k', ChannelMode::Key),
    ('m', ChannelMode::Moderated),
    ('n', ChannelMode::NoExternal),
    ('s', ChannelMode::Secret),
    ('t', ChannelMode::TopicLock),
]);

pub(crate) static MEMBER_ROLES: ModeTable<MemberRole> = ModeTable::new(&[
    ('a', MemberRole::Admin),
    ('h', MemberRole::HalfOp),
    ('o', MemberRole::Op),
    ('q', MemberRole::Owner),
    ('v', MemberRole::Voice),
]);

/// NAMES/WHO prefix for the highest role held.
pub(crate) fn role_prefix(roles: FlagSet<MemberRole>) -> &'static str {
    if roles.contains(MemberRole::Owner) {
        "~"
    } else if roles.contains(MemberRole::Admin) {
        "&"
    } else if roles.contains(MemberRole::Op) {
        "@"
    } else if roles.contains(MemberRole::HalfOp) {
        "%"
    } else if roles.contains(MemberRole::Voice) {
        "+"
    } else {
        ""
    }
}

pub(crate) fn is_chan_operator(roles: FlagSet<MemberRole>) -> bool {
    roles.contains(MemberRole::Owner)
        || roles.contains(MemberRole::Admin)
        || roles.contains(MemberRole::Op)
}

pub(crate) fn is_half_operator(roles: FlagSet<MemberRole>) -> bool {
    is_chan_operator(roles) || roles.contains(MemberRole::HalfOp)
}

/// Any role at all lets the holder speak on a moderated channel.
pub(crate) fn can_speak_when_moderated(roles: FlagSet<MemberRole>) -> bool {
    !roles.is_empty()
}
