// store.rs - concurrent client and channel registries
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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::channel::Channel;
use crate::client::{Client, ClientId};

pub(crate) struct ClientStore {
    clients: DashMap<ClientId, Arc<Client>>,
    next_id: AtomicU64,
}

impl ClientStore {
    pub(crate) fn new() -> ClientStore {
        ClientStore {
            clients: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Ids are never reused for the lifetime of the process.
    pub(crate) fn alloc_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn add(&self, client: Arc<Client>) {
        self.clients.insert(client.id, client);
    }

    pub(crate) fn remove(&self, id: ClientId) -> Option<Arc<Client>> {
        self.clients.remove(&id).map(|(_, client)| client)
    }

    pub(crate) fn get(&self, id: ClientId) -> Option<Arc<Client>> {
        self.clients.get(&id).map(|entry| entry.value().clone())
    }

    /// Point-in-time snapshot; entries may join or quit while the caller
    /// iterates.
    pub(crate) fn all(&self) -> Vec<Arc<Client>> {
        self.clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.len()
    }

    // Linear scan over a snapshot; nicknames are mutable so no secondary
    // index is kept.
    pub(crate) fn find_by_nick(&self, nick: &str) -> Option<Arc<Client>> {
        self.all()
            .into_iter()
            .find(|client| client.state().nick.as_deref() == Some(nick))
    }
}

pub(crate) struct ChannelStore {
    channels: DashMap<String, Arc<Channel>>,
}

impl ChannelStore {
    pub(crate) fn new() -> ChannelStore {
        ChannelStore {
            channels: DashMap::new(),
        }
    }

    pub(crate) fn add(&self, channel: Arc<Channel>) {
        self.channels.insert(channel.name.clone(), channel);
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.remove(name).map(|(_, channel)| channel)
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.get(name).map(|entry| entry.value().clone())
    }

    pub(crate) fn all(&self) -> Vec<Arc<Channel>> {
        self.channels
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.channels.len()
    }

    /// Channels the given client is currently a member of.
    pub(crate) fn joined_by(&self, id: ClientId) -> Vec<Arc<Channel>> {
        self.all()
            .into_iter()
            .filter(|channel| channel.has_member(id))
            .collect()
    }
}
