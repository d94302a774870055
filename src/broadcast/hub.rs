//! Channel hub: connection registry and per-channel fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::message::{ClientMessage, ServerMessage};

pub type ConnectionId = Uuid;

struct Connection {
    tx: mpsc::Sender<String>,
    channels: HashSet<String>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, Connection>,
    channels: HashMap<String, HashSet<ConnectionId>>,
}

/// Shared registry of live connections and their channel memberships.
///
/// Every mutation and every publish takes the same lock, so a publish sees either the state
/// before or after a concurrent subscribe/unsubscribe/disconnect, never a partial one. Each
/// connection drains a bounded queue; a full queue drops the message for that connection only.
pub struct ChannelHub {
    state: Mutex<HubState>,
    buffer: usize,
}

impl ChannelHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            buffer: buffer.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a connection. Dropping the guard purges it and all its memberships.
    pub fn connect(self: &Arc<Self>) -> (ConnectionGuard, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        self.lock().connections.insert(
            id,
            Connection {
                tx,
                channels: HashSet::new(),
            },
        );
        debug!(connection = %id, "connection opened");
        (
            ConnectionGuard {
                hub: Arc::clone(self),
                id,
            },
            rx,
        )
    }

    /// Returns false when the connection is unknown (already closed).
    pub fn subscribe(&self, id: ConnectionId, channel: &str) -> bool {
        let mut state = self.lock();
        let Some(conn) = state.connections.get_mut(&id) else {
            return false;
        };
        conn.channels.insert(channel.to_string());
        state.channels.entry(channel.to_string()).or_default().insert(id);
        debug!(connection = %id, channel = %channel, "subscribed");
        true
    }

    pub fn unsubscribe(&self, id: ConnectionId, channel: &str) -> bool {
        let mut state = self.lock();
        let Some(conn) = state.connections.get_mut(&id) else {
            return false;
        };
        conn.channels.remove(channel);
        remove_member(&mut state.channels, channel, id);
        debug!(connection = %id, channel = %channel, "unsubscribed");
        true
    }

    /// Close a connection: remove it from every channel it joined. Idempotent.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut state = self.lock();
        if let Some(conn) = state.connections.remove(&id) {
            for channel in &conn.channels {
                remove_member(&mut state.channels, channel, id);
            }
            debug!(connection = %id, channels = conn.channels.len(), "connection closed");
        }
    }

    /// Send `{type:"data", channel, data, timestamp}` to every open subscriber of `channel`.
    /// Returns the number of connections the message was queued for.
    pub fn publish(&self, channel: &str, payload: Value) -> usize {
        let text = ServerMessage::data(channel, payload).to_json();
        let state = self.lock();
        let Some(members) = state.channels.get(channel) else {
            return 0;
        };
        let mut delivered = 0;
        for id in members {
            let Some(conn) = state.connections.get(id) else { continue };
            match conn.tx.try_send(text.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(connection = %id, channel = %channel, "outbound queue full, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Apply one client text frame. Returns the reply to send back, if any. Malformed frames
    /// are logged and ignored.
    pub fn handle_client_text(&self, id: ConnectionId, text: &str) -> Option<ServerMessage> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Subscribe { channel }) if !channel.is_empty() => {
                self.subscribe(id, &channel);
                None
            }
            Ok(ClientMessage::Unsubscribe { channel }) if !channel.is_empty() => {
                self.unsubscribe(id, &channel);
                None
            }
            Ok(ClientMessage::Ping) => Some(ServerMessage::pong()),
            Ok(_) => {
                warn!(connection = %id, "ignoring message with empty channel");
                None
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "ignoring malformed client message");
                None
            }
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock().channels.get(channel).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    pub fn channels_of(&self, id: ConnectionId) -> Vec<String> {
        let mut channels: Vec<String> = self
            .lock()
            .connections
            .get(&id)
            .map(|c| c.channels.iter().cloned().collect())
            .unwrap_or_default();
        channels.sort();
        channels
    }
}

fn remove_member(channels: &mut HashMap<String, HashSet<ConnectionId>>, channel: &str, id: ConnectionId) {
    if let Some(members) = channels.get_mut(channel) {
        members.remove(&id);
        if members.is_empty() {
            channels.remove(channel);
        }
    }
}

/// Live connection handle. Dropping it moves the connection to closed.
pub struct ConnectionGuard {
    hub: Arc<ChannelHub>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}
