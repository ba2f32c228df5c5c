// channel.rs - channel entity
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

use std::collections::{HashMap, HashSet};

use flagset::FlagSet;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::client::{now_ts, ClientId};
use crate::modes::{ChannelMode, MemberRole};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Topic {
    pub(crate) text: String,
    pub(crate) nick: String,
    pub(crate) set_at: u64,
}

#[derive(Debug)]
pub(crate) struct ChannelState {
    pub(crate) topic: Option<Topic>,
    pub(crate) modes: FlagSet<ChannelMode>,
    pub(crate) key: Option<String>,
    pub(crate) founder: ClientId,
    pub(crate) invites: HashSet<ClientId>,
    pub(crate) members: HashMap<ClientId, FlagSet<MemberRole>>,
    pub(crate) created_at: u64,
}

/// Membership is keyed by client id, so nick changes never touch channel
/// state. Lock order is store, then channel, then client.
pub(crate) struct Channel {
    pub(crate) name: String,
    state: RwLock<ChannelState>,
}

impl Channel {
    /// A channel springs into existence on first join; the joiner becomes
    /// founder with owner and operator roles.
    pub(crate) fn new_on_join(name: String, founder: ClientId) -> Channel {
        let mut members = HashMap::new();
        members.insert(founder, MemberRole::Owner | MemberRole::Op);
        Channel {
            name,
            state: RwLock::new(ChannelState {
                topic: None,
                modes: FlagSet::default(),
                key: None,
                founder,
                invites: HashSet::new(),
                members,
                created_at: now_ts(),
            }),
        }
    }

    pub(crate) fn state(&self) -> RwLockReadGuard<'_, ChannelState> {
        self.state.read()
    }

    pub(crate) fn state_mut(&self) -> RwLockWriteGuard<'_, ChannelState> {
        self.state.write()
    }

    pub(crate) fn has_member(&self, id: ClientId) -> bool {
        self.state.read().members.contains_key(&id)
    }

    pub(crate) fn roles_of(&self, id: ClientId) -> Option<FlagSet<MemberRole>> {
        self.state.read().members.get(&id).copied()
    }

    pub(crate) fn remove_member(&self, id: ClientId) -> usize {
        let mut state = self.state.write();
        state.members.remove(&id);
        state.invites.remove(&id);
        state.members.len()
    }

    pub(crate) fn member_ids(&self) -> Vec<ClientId> {
        self.state.read().members.keys().copied().collect()
    }

    pub(crate) fn members_snapshot(&self) -> Vec<(ClientId, FlagSet<MemberRole>)> {
        self.state
            .read()
            .members
            .iter()
            .map(|(id, roles)| (*id, *roles))
            .collect()
    }

    pub(crate) fn member_count(&self) -> usize {
        self.state.read().members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state.read().members.is_empty()
    }

    /// Grants or revokes one role. Returns false when the target is not a
    /// member.
    pub(crate) fn set_role(&self, id: ClientId, role: MemberRole, on: bool) -> bool {
        let mut state = self.state.write();
        match state.members.get_mut(&id) {
            Some(roles) => {
                if on {
                    *roles |= role;
                } else {
                    *roles &= !role;
                }
                true
            }
            None => false,
        }
    }

    /// Secret channels are visible to members only. Takes the state lock
    /// exactly once; the lock is not recursive, so callers must not hold
    /// a guard of their own.
    pub(crate) fn is_visible_to(&self, id: ClientId) -> bool {
        let state = self.state.read();
        !state.modes.contains(ChannelMode::Secret) || state.members.contains_key(&id)
    }

    pub(crate) fn topic(&self) -> Option<Topic> {
        self.state.read().topic.clone()
    }

    pub(crate) fn set_topic(&self, text: &str, nick: &str) {
        self.state.write().topic = Some(Topic {
            text: text.to_string(),
            nick: nick.to_string(),
            set_at: now_ts(),
        });
    }
}
