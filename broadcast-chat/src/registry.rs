use std::{
    collections::HashMap,
    error::Error,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;

use crate::message::ServerMessage;

pub type ConnectionId = u64;

/// Sending half of a connection's outbound queue.
///
/// The session that owns the socket drains the queue in its writer task, so
/// delivering never waits on the network.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<Message>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queues `message` for the peer. Fails once the writer side has gone away.
    pub fn deliver(&self, message: &ServerMessage) -> Result<(), mpsc::error::SendError<Message>> {
        self.sender.send(message.to_frame())
    }
}

#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: ConnectionId,
    pub outbox: Outbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    AlreadyRegistered(ConnectionId),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::AlreadyRegistered(id) => {
                write!(f, "connection {id} is already registered")
            }
        }
    }
}

impl Error for RegisterError {}

/// The set of live connections. Sessions add and remove themselves; fan-out
/// only ever reads a snapshot.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Outbox>>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn register(&self, id: ConnectionId, outbox: Outbox) -> Result<(), RegisterError> {
        let mut connections = self.connections.lock().await;

        if connections.contains_key(&id) {
            return Err(RegisterError::AlreadyRegistered(id));
        }

        connections.insert(id, outbox);
        Ok(())
    }

    /// Removes `id` if present. Returns whether anything was removed.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        connections.remove(&id).is_some()
    }

    /// Copies the current members out from under the lock.
    pub async fn snapshot(&self) -> Vec<Recipient> {
        let connections = self.connections.lock().await;
        connections
            .iter()
            .map(|(id, outbox)| Recipient {
                id: *id,
                outbox: outbox.clone(),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}
