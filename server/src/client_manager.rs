//! Connected client registry and outbound frame fan-out
//!
//! This module tracks every live session on the server side:
//! - Player id assignment (smallest free id) and capacity enforcement
//! - A bounded outbound queue per client, drained by that client's writer task
//! - Best-effort delivery: a full queue drops the frame instead of blocking
//!
//! The manager never touches the socket itself. Frames are encoded once by the
//! caller and shared between all queues.

use log::{info, warn};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// An encoded, length-prefixed packet ready to be written to a socket.
pub type Frame = Arc<[u8]>;

/// Frames buffered per client before new ones are dropped.
pub const OUTBOUND_QUEUE_LEN: usize = 64;

/// Only every Nth dropped frame is logged for a given client.
const DROP_LOG_INTERVAL: u64 = 100;

/// A registered session and its outbound queue
#[derive(Debug)]
pub struct Client {
    /// Player id, also the key of the player in the world state
    pub id: u32,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// Frames that could not be queued because the queue was full or closed
    pub dropped_frames: u64,
    outbound: mpsc::Sender<Frame>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            addr,
            dropped_frames: 0,
            outbound,
        }
    }

    /// Queues a frame without waiting. Returns false and counts the drop when
    /// the queue is full or the writer has gone away.
    fn try_deliver(&mut self, frame: Frame) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.dropped_frames += 1;
                if self.dropped_frames % DROP_LOG_INTERVAL == 1 {
                    warn!(
                        "Dropping frames for client {} ({}): {} dropped so far",
                        self.id, self.addr, self.dropped_frames
                    );
                }
                false
            }
        }
    }
}

/// Outcome of one fan-out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Registry of every connected client
///
/// Shared between session tasks (register/unregister), the broadcast task
/// (fan-out) and the game loop (direct replies) behind an async `RwLock`.
pub struct ClientManager {
    /// Connected clients indexed by player id
    clients: BTreeMap<u32, Client>,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            max_clients,
        }
    }

    /// Registers a connection under the smallest free player id
    ///
    /// Returns None when the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, outbound: mpsc::Sender<Frame>) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = (0u32..)
            .find(|id| !self.clients.contains_key(id))
            .unwrap_or(u32::MAX);

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbound));
        Some(client_id)
    }

    /// Returns true if the client was found and removed.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} disconnected ({} frames dropped over the session)",
                client.id, client.dropped_frames
            );
            true
        } else {
            false
        }
    }

    /// Queues a frame for one client. False if unknown or the frame was dropped.
    pub fn send_to(&mut self, client_id: u32, frame: Frame) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => client.try_deliver(frame),
            None => false,
        }
    }

    /// Queues the same frame for every client without blocking on any of them.
    pub fn broadcast(&mut self, frame: &Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for client in self.clients.values_mut() {
            if client.try_deliver(Arc::clone(frame)) {
                report.delivered += 1;
            } else {
                report.dropped += 1;
            }
        }
        report
    }

    pub fn dropped_frames(&self, client_id: u32) -> Option<u64> {
        self.clients.get(&client_id).map(|c| c.dropped_frames)
    }

    pub fn contains(&self, client_id: u32) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn client_ids(&self) -> Vec<u32> {
        self.clients.keys().copied().collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn frame(bytes: &[u8]) -> Frame {
        Arc::from(bytes)
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(5);
        assert_eq!(manager.max_clients, 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_ids_start_at_zero_and_reuse_gaps() {
        let mut manager = ClientManager::new(4);
        let (tx, _rx) = mpsc::channel(4);

        assert_eq!(manager.add_client(test_addr(), tx.clone()), Some(0));
        assert_eq!(manager.add_client(test_addr(), tx.clone()), Some(1));
        assert_eq!(manager.add_client(test_addr(), tx.clone()), Some(2));

        assert!(manager.remove_client(&1));
        assert_eq!(manager.add_client(test_addr(), tx.clone()), Some(1));
        assert_eq!(manager.client_ids(), vec![0, 1, 2]);
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);
        let (tx, _rx) = mpsc::channel(4);

        assert!(manager.add_client(test_addr(), tx.clone()).is_some());
        assert!(manager.add_client(test_addr(), tx).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_nonexistent_client() {
        let mut manager = ClientManager::new(2);
        assert!(!manager.remove_client(&999));
    }

    #[test]
    fn test_send_to_known_and_unknown() {
        let mut manager = ClientManager::new(2);
        let (tx, mut rx) = mpsc::channel(4);
        let id = manager.add_client(test_addr(), tx).unwrap();

        assert!(manager.send_to(id, frame(&[1, 2, 3])));
        assert!(!manager.send_to(id + 1, frame(&[4])));
        assert_eq!(&*rx.try_recv().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let mut manager = ClientManager::new(2);
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        let slow = manager.add_client(test_addr(), slow_tx).unwrap();
        let fast = manager.add_client(test_addr(), fast_tx).unwrap();

        let data = frame(&[9]);
        assert_eq!(
            manager.broadcast(&data),
            BroadcastReport {
                delivered: 2,
                dropped: 0
            }
        );
        assert_eq!(
            manager.broadcast(&data),
            BroadcastReport {
                delivered: 1,
                dropped: 1
            }
        );

        assert_eq!(manager.dropped_frames(slow), Some(1));
        assert_eq!(manager.dropped_frames(fast), Some(0));
        assert!(fast_rx.try_recv().is_ok());
        assert!(fast_rx.try_recv().is_ok());
    }

    #[test]
    fn test_closed_queue_counts_as_drop() {
        let mut manager = ClientManager::new(1);
        let (tx, rx) = mpsc::channel(4);
        let id = manager.add_client(test_addr(), tx).unwrap();
        drop(rx);

        assert!(!manager.send_to(id, frame(&[0])));
        assert_eq!(manager.dropped_frames(id), Some(1));
    }
}
