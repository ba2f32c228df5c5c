// client.rs - per-connection client entity
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
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use flagset::FlagSet;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::modes::UserMode;

pub(crate) type ClientId = u64;

/// Lines a client may have queued before its writer is considered too
/// slow to live.
pub(crate) const OUTBOUND_QUEUE_LEN: usize = 100;

#[derive(Debug)]
pub(crate) struct ClientState {
    pub(crate) nick: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) realname: Option<String>,
    pub(crate) hostname: String,
    pub(crate) modes: FlagSet<UserMode>,
    pub(crate) away: Option<String>,
    pub(crate) registered: bool,
    pub(crate) password: Option<String>,
    pub(crate) quit_reason: Option<String>,
}

/// One live connection. Mutable identity lives behind the state lock,
/// liveness signalling is lock-free so any task can kill a client without
/// touching its state.
pub(crate) struct Client {
    pub(crate) id: ClientId,
    pub(crate) addr: SocketAddr,
    sender: Sender<String>,
    cancel: CancellationToken,
    killed: AtomicBool,
    pub(crate) pong_notify: Notify,
    state: RwLock<ClientState>,
}

impl Client {
    pub(crate) fn new(id: ClientId, addr: SocketAddr, sender: Sender<String>) -> Client {
        Client {
            id,
            addr,
            sender,
            cancel: CancellationToken::new(),
            killed: AtomicBool::new(false),
            pong_notify: Notify::new(),
            state: RwLock::new(ClientState {
                nick: None,
                username: None,
                realname: None,
                hostname: addr.ip().to_string(),
                modes: FlagSet::default(),
                away: None,
                registered: false,
                password: None,
                quit_reason: None,
            }),
        }
    }

    pub(crate) fn state(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read()
    }

    pub(crate) fn state_mut(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write()
    }

    /// Nick for numeric replies, `*` before one is set.
    pub(crate) fn display_name(&self) -> String {
        self.state
            .read()
            .nick
            .clone()
            .unwrap_or_else(|| "*".to_string())
    }

    /// `nick!~user@host` message source. Missing parts are elided the same
    /// way for every caller, so broadcasts stay consistent.
    pub(crate) fn source(&self) -> String {
        let state = self.state.read();
        let mut out = String::new();
        if let Some(ref nick) = state.nick {
            out.push_str(nick);
            out.push('!');
        }
        if let Some(ref username) = state.username {
            out.push('~');
            out.push_str(username);
        }
        out.push('@');
        out.push_str(&state.hostname);
        out
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.state.read().registered
    }

    /// Queues one outbound line without blocking. A full queue means the
    /// peer stopped reading, and the client is killed rather than letting
    /// the sender wait on it.
    pub(crate) fn send_line(&self, line: String) {
        if self.is_killed() {
            return;
        }
        match self.sender.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full for {}", self.addr);
                self.kill("SendQ exceeded");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    pub(crate) fn send_msg<T: fmt::Display>(&self, source: &str, t: T) {
        self.send_line(format!(":{} {}", source, t));
    }

    /// Requests teardown. Only the first caller wins: its reason becomes
    /// the quit reason and the cancellation fans out to all three workers.
    /// Returns whether this call was the winner.
    pub(crate) fn kill(&self, reason: &str) -> bool {
        if self.killed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.state.write().quit_reason = Some(reason.to_string());
        self.cancel.cancel();
        true
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub(crate) fn quit_reason(&self) -> Option<String> {
        self.state.read().quit_reason.clone()
    }
}

pub(crate) fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::sync::mpsc;

    fn test_client(queue_len: usize) -> (Client, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(queue_len);
        let addr = "127.0.0.1:46000".parse().unwrap();
        (Client::new(7, addr, sender), receiver)
    }

    #[test]
    fn test_display_name_and_source() {
        let (client, _rx) = test_client(8);
        assert_eq!("*", client.display_name());
        assert_eq!("@127.0.0.1", client.source());

        client.state_mut().nick = Some("alice".to_string());
        assert_eq!("alice", client.display_name());
        assert_eq!("alice!@127.0.0.1", client.source());

        client.state_mut().username = Some("ally".to_string());
        assert_eq!("alice!~ally@127.0.0.1", client.source());
    }

    #[test]
    fn test_kill_first_caller_wins() {
        let (client, _rx) = test_client(8);
        assert!(!client.is_killed());
        assert!(client.kill("First reason"));
        assert!(!client.kill("Second reason"));
        assert!(!client.kill("Third reason"));
        assert!(client.is_killed());
        assert_eq!(Some("First reason".to_string()), client.quit_reason());
    }

    #[tokio::test]
    async fn test_kill_wakes_cancelled() {
        let (client, _rx) = test_client(8);
        let fired = {
            tokio::select! {
                _ = client.cancelled() => true,
                _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => false,
            }
        };
        assert!(!fired);
        client.kill("Bye");
        client.cancelled().await; // returns immediately once cancelled
    }

    #[tokio::test]
    async fn test_send_line_queues() {
        let (client, mut rx) = test_client(8);
        client.send_line("PING :x".to_string());
        assert_eq!(Some("PING :x".to_string()), rx.recv().await);
    }

    #[test]
    fn test_send_line_full_queue_kills() {
        let (client, _rx) = test_client(1);
        client.send_line("one".to_string());
        assert!(!client.is_killed());
        client.send_line("two".to_string());
        assert!(client.is_killed());
        assert_eq!(Some("SendQ exceeded".to_string()), client.quit_reason());
        // further sends are dropped silently
        client.send_line("three".to_string());
    }

    #[test]
    fn test_send_line_after_kill_is_dropped() {
        let (client, mut rx) = test_client(8);
        client.kill("Done");
        client.send_line("late".to_string());
        assert!(rx.try_recv().is_err());
    }
}
