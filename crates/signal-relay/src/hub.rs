//! Relay hub: the session registry and message fan-out
//!
//! The hub owns every live connection and forwards each signaling message
//! to all peers except its sender. It has no suspension points; the
//! transport adapter calls it from whatever task handles the event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use signal_core::{ConnectionId, RelayError};

use crate::messages::SignalMessage;

/// Messages a peer may have in flight towards its socket before further
/// ones are dropped for that peer
pub const PEER_QUEUE_CAPACITY: usize = 64;

/// Sending half of a peer's outbound queue
pub type PeerSender = mpsc::Sender<SignalMessage>;

/// Receiving half of a peer's outbound queue, drained by the transport
pub type PeerReceiver = mpsc::Receiver<SignalMessage>;

/// A live connection in the registry
struct Connection {
    tx: PeerSender,
    connected_at: Instant,
}

impl Connection {
    /// Closed once the transport dropped its receiver
    fn is_active(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Outcome of routing a single message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered to this many peers (possibly zero)
    Forwarded { recipients: usize },
    /// IPv6 candidate, intentionally not relayed
    Suppressed,
}

impl Delivery {
    pub fn recipients(&self) -> usize {
        match self {
            Delivery::Forwarded { recipients } => *recipients,
            Delivery::Suppressed => 0,
        }
    }
}

/// Counters exposed on the stats endpoint
#[derive(Clone, Debug, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub messages_forwarded: u64,
    pub candidates_suppressed: u64,
    pub messages_rejected: u64,
    /// Skipped because the recipient's queue was full
    pub messages_dropped: u64,
    pub oldest_connection_secs: u64,
}

/// Registry of connected peers plus the broadcast rule
///
/// Broadcasts hold the registry read lock, so several may run at once;
/// connects and disconnects take the write lock.
pub struct RelayHub {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    forwarded: AtomicU64,
    suppressed: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            forwarded: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a new peer.
    ///
    /// Returns its identifier and the queue of messages addressed to it.
    pub fn on_connect(&self) -> (ConnectionId, PeerReceiver) {
        let (tx, rx) = mpsc::channel(PEER_QUEUE_CAPACITY);
        let mut connections = self.connections.write();

        let mut id = ConnectionId::random();
        while connections.contains_key(&id) {
            id = ConnectionId::random();
        }

        connections.insert(
            id.clone(),
            Connection {
                tx,
                connected_at: Instant::now(),
            },
        );
        info!("Peer {} connected ({} active)", id, connections.len());

        (id, rx)
    }

    /// Remove a peer. Unknown ids are ignored.
    ///
    /// Returns `true` if the peer was registered.
    pub fn on_disconnect(&self, id: &ConnectionId) -> bool {
        let mut connections = self.connections.write();
        match connections.remove(id) {
            Some(_) => {
                info!("Peer {} disconnected ({} active)", id, connections.len());
                true
            }
            None => {
                debug!("Disconnect for unknown peer {}", id);
                false
            }
        }
    }

    /// Forward `message` from `sender` to every other active peer.
    ///
    /// Candidates whose address is IPv6 are dropped. A candidate without an
    /// address field is rejected; the error is logged and returned, and the
    /// sender stays connected.
    ///
    /// Sends never wait: a recipient whose queue is full is skipped for this
    /// message, the same as one that has gone away.
    pub fn on_message(
        &self,
        sender: &ConnectionId,
        message: SignalMessage,
    ) -> Result<Delivery, RelayError> {
        let family = match message.address_family() {
            Ok(family) => family,
            Err(e) => {
                self.reject(sender, &e);
                return Err(e);
            }
        };

        if let Some(family) = family.filter(|f| f.is_ipv6()) {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            debug!("Dropped {} candidate from {}", family, sender);
            return Ok(Delivery::Suppressed);
        }

        let connections = self.connections.read();
        let mut recipients = 0;
        let mut dropped = 0;

        for (id, conn) in connections.iter() {
            if id == sender || !conn.is_active() {
                continue;
            }
            match conn.tx.try_send(message.clone()) {
                Ok(()) => recipients += 1,
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    debug!("Queue full for {}, skipping {}", id, message.kind());
                }
                // Receiver gone between the check and the send
                Err(TrySendError::Closed(_)) => {}
            }
        }
        drop(connections);

        if dropped > 0 {
            self.dropped.fetch_add(dropped, Ordering::Relaxed);
        }

        self.forwarded.fetch_add(recipients as u64, Ordering::Relaxed);
        debug!(
            "Relayed {} from {} to {} peer(s)",
            message.kind(),
            sender,
            recipients
        );

        Ok(Delivery::Forwarded { recipients })
    }

    /// Record a message that was refused before reaching the registry
    pub fn reject(&self, sender: &ConnectionId, error: &RelayError) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        warn!("Rejected message from {} ({}): {}", sender, error.kind(), error);
    }

    /// Number of registered peers
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Snapshot of the hub counters
    pub fn stats(&self) -> HubStats {
        let connections = self.connections.read();
        HubStats {
            connections: connections.len(),
            messages_forwarded: self.forwarded.load(Ordering::Relaxed),
            candidates_suppressed: self.suppressed.load(Ordering::Relaxed),
            messages_rejected: self.rejected.load(Ordering::Relaxed),
            messages_dropped: self.dropped.load(Ordering::Relaxed),
            oldest_connection_secs: connections
                .values()
                .map(|c| c.connected_at.elapsed().as_secs())
                .max()
                .unwrap_or(0),
        }
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}
