//! Relay hub - tracks connections and decides who hears whom

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Relay connection id
pub type ConnId = Uuid;

/// How relayed messages are routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    /// Connections are paired in arrival order; each pair is an isolated session
    #[default]
    Paired,
    /// Every message goes to every other connection
    Broadcast,
}

/// Connection registry for the relay.
///
/// The hub never inspects message contents. It only decides the recipient
/// set of a connection and pushes text into the per-connection outbound
/// queues, which the socket writer tasks drain in order.
pub struct RelayHub {
    mode: RelayMode,
    /// Outbound queue per connection
    peers: DashMap<ConnId, mpsc::Sender<String>>,
    /// Map of connection -> session partner (paired mode)
    partners: DashMap<ConnId, ConnId>,
    /// Connection waiting for a partner (paired mode)
    waiting: Mutex<Option<ConnId>>,
}

impl RelayHub {
    pub fn new(mode: RelayMode) -> Self {
        Self {
            mode,
            peers: DashMap::new(),
            partners: DashMap::new(),
            waiting: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> RelayMode {
        self.mode
    }

    /// Register a connection.
    /// Returns the connections that should be told about the newcomer.
    pub fn join(&self, conn_id: ConnId, tx: mpsc::Sender<String>) -> Vec<ConnId> {
        self.peers.insert(conn_id, tx);

        match self.mode {
            RelayMode::Broadcast => {
                info!(conn_id = %conn_id, peers = self.peers.len(), "Peer joined broadcast relay");
                self.others(conn_id)
            }
            RelayMode::Paired => {
                let mut waiting = self.waiting.lock();
                match waiting.take() {
                    Some(partner) if self.peers.contains_key(&partner) => {
                        self.partners.insert(conn_id, partner);
                        self.partners.insert(partner, conn_id);
                        info!(conn_id = %conn_id, partner = %partner, "Session opened");
                        vec![partner]
                    }
                    _ => {
                        *waiting = Some(conn_id);
                        info!(conn_id = %conn_id, "Peer waiting for a partner");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Connections that receive whatever `conn_id` sends
    pub fn recipients(&self, conn_id: ConnId) -> Vec<ConnId> {
        match self.mode {
            RelayMode::Broadcast => self.others(conn_id),
            RelayMode::Paired => self
                .partners
                .get(&conn_id)
                .map(|partner| vec![*partner])
                .unwrap_or_default(),
        }
    }

    /// Push a message into one connection's outbound queue.
    /// Waits for queue space so nothing is ever dropped or reordered.
    pub async fn send_to(&self, conn_id: ConnId, text: String) -> bool {
        // Clone the sender so no map guard is held across the await
        let Some(tx) = self.peers.get(&conn_id).map(|tx| tx.clone()) else {
            return false;
        };

        if tx.send(text).await.is_err() {
            debug!(conn_id = %conn_id, "Outbound queue closed");
            return false;
        }
        true
    }

    /// Forward text verbatim from `from` to its recipients.
    /// Returns how many connections received it.
    pub async fn forward(&self, from: ConnId, text: &str) -> usize {
        let mut delivered = 0;
        for conn_id in self.recipients(from) {
            if self.send_to(conn_id, text.to_string()).await {
                delivered += 1;
            }
        }

        if delivered == 0 {
            debug!(conn_id = %from, "Message had no recipients");
        }
        delivered
    }

    /// Remove a connection and dissolve its session
    pub fn leave(&self, conn_id: ConnId) {
        self.peers.remove(&conn_id);

        {
            let mut waiting = self.waiting.lock();
            if *waiting == Some(conn_id) {
                *waiting = None;
            }
        }

        if let Some((_, partner)) = self.partners.remove(&conn_id) {
            self.partners.remove(&partner);
            warn!(conn_id = %conn_id, partner = %partner, "Session closed by disconnect");
        }

        info!(conn_id = %conn_id, peers = self.peers.len(), "Peer left relay");
    }

    /// Number of open connections
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Number of paired sessions
    pub fn session_count(&self) -> usize {
        self.partners.len() / 2
    }

    /// Whether a connection is waiting for a partner
    pub fn has_waiting(&self) -> bool {
        self.waiting.lock().is_some()
    }

    fn others(&self, conn_id: ConnId) -> Vec<ConnId> {
        self.peers
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| *id != conn_id)
            .collect()
    }
}
