use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

use super::message::PeerMessage;

struct PeerHandle {
    addr: String,
    tx: UnboundedSender<PeerMessage>,
}

/// The set of live peer connections.
///
/// Each entry is the outbound queue of one connection task. Peers are
/// independent fan-out targets: a send that fails drops that peer and
/// never aborts delivery to the others. There is no ordering guarantee
/// across peers, but one connection sees its messages in send order.
#[derive(Clone)]
pub struct PeerRegistry {
    inner: Arc<Mutex<HashMap<u64, PeerHandle>>>,
    next_id: Arc<AtomicU64>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Add a connection's outbound queue; returns its peer id.
    pub fn register(&self, addr: String, tx: UnboundedSender<PeerMessage>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut peers = self.inner.lock().expect("mutex poisoned");
        peers.insert(id, PeerHandle { addr, tx });
        debug!("P2P - registered peer #{id} ({} live)", peers.len());
        id
    }

    /// Drop a connection. Safe to call more than once.
    pub fn deregister(&self, id: u64) {
        let mut peers = self.inner.lock().expect("mutex poisoned");
        if let Some(peer) = peers.remove(&id) {
            debug!("P2P - removed peer #{id} ({}), {} live", peer.addr, peers.len());
        }
    }

    /// Queue `msg` for one peer; a dead queue drops the peer.
    pub fn send(&self, id: u64, msg: PeerMessage) {
        let mut peers = self.inner.lock().expect("mutex poisoned");
        if let Some(peer) = peers.get(&id) {
            if peer.tx.send(msg).is_err() {
                warn!("P2P - peer #{id} ({}) is gone, dropping it", peer.addr);
                peers.remove(&id);
            }
        }
    }

    /// Queue `msg` for every live peer, dropping the ones that fail.
    pub fn broadcast(&self, msg: PeerMessage) {
        let mut peers = self.inner.lock().expect("mutex poisoned");
        let dead: Vec<u64> = peers
            .iter()
            .filter(|(_, peer)| peer.tx.send(msg.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            if let Some(peer) = peers.remove(&id) {
                warn!("P2P - peer #{id} ({}) failed mid-broadcast, removed", peer.addr);
            }
        }
    }

    /// Remote addresses of all live peers.
    pub fn addresses(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("mutex poisoned")
            .values()
            .map(|peer| peer.addr.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").len()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
