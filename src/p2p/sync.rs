use log::{debug, info, warn};

use crate::blockchain::{Block, SharedChain};
use super::message::{MessageKind, PeerMessage};
use super::registry::PeerRegistry;

/// What a chain response asks the node to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The ledger advanced; announce the new tip to every peer.
    BroadcastLatest,
    /// The peer is further ahead than one block; ask everyone for
    /// their full chain.
    QueryAll,
    /// Nothing to do, the local chain is already current or ahead.
    NoOp,
}

/// Dispatch one incoming peer message.
///
/// Queries are answered on the same connection; chain responses run
/// the fork choice and may fan out follow-up messages to all peers.
pub fn handle_message(chain: &SharedChain, peers: &PeerRegistry, peer_id: u64, msg: PeerMessage) {
    match msg.kind {
        MessageKind::QueryLatest => {
            peers.send(peer_id, PeerMessage::response_chain(&[chain.latest()]));
        }
        MessageKind::QueryAll => {
            peers.send(peer_id, PeerMessage::response_chain(&chain.snapshot()));
        }
        MessageKind::ResponseChain => {
            let Some(raw) = msg.data.as_deref() else {
                warn!("P2P - RESPONSE_CHAIN from peer #{peer_id} carries no data");
                return;
            };
            let received: Vec<Block> = match serde_json::from_str(raw) {
                Ok(blocks) => blocks,
                Err(e) => {
                    warn!("P2P - malformed chain from peer #{peer_id}: {e}");
                    return;
                }
            };
            match handle_chain_response(chain, received) {
                SyncOutcome::BroadcastLatest => {
                    peers.broadcast(PeerMessage::response_chain(&[chain.latest()]));
                }
                SyncOutcome::QueryAll => {
                    peers.broadcast(PeerMessage::query_all());
                }
                SyncOutcome::NoOp => {}
            }
        }
    }
}

/// Fork choice over a received chain (one block or many).
///
/// A single block that extends the local tip is appended; a single
/// block further ahead means we are behind by more than one, so the
/// full chain is requested. A multi-block chain goes through
/// whole-chain validation and the length/tie-break replacement rule.
pub fn handle_chain_response(chain: &SharedChain, received: Vec<Block>) -> SyncOutcome {
    let Some(latest_received) = received.last() else {
        debug!("P2P - ignoring empty chain response");
        return SyncOutcome::NoOp;
    };

    let local_tip = chain.latest();
    if latest_received.header.index <= local_tip.header.index {
        debug!(
            "P2P - received tip #{} is not ahead of ours (#{}), nothing to do",
            latest_received.header.index, local_tip.header.index
        );
        return SyncOutcome::NoOp;
    }

    info!(
        "P2P - we are possibly behind: our tip #{}, peer tip #{}",
        local_tip.header.index, latest_received.header.index
    );

    if received.len() == 1 {
        let block = latest_received.clone();
        if block.header.previous_hash == local_tip.hash() && chain.append(block) {
            SyncOutcome::BroadcastLatest
        } else {
            // More than one block behind, or the append found a fault;
            // either way only a full chain can reconcile us.
            info!("P2P - requesting the full chain from peers");
            SyncOutcome::QueryAll
        }
    } else if chain.replace(received) {
        SyncOutcome::BroadcastLatest
    } else {
        SyncOutcome::NoOp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::testutil::{next_block, valid_chain};

    #[test]
    fn stale_response_is_ignored() {
        let chain = SharedChain::new();
        let outcome = handle_chain_response(&chain, vec![chain.latest()]);
        assert_eq!(outcome, SyncOutcome::NoOp);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn empty_response_is_ignored() {
        let chain = SharedChain::new();
        assert_eq!(handle_chain_response(&chain, vec![]), SyncOutcome::NoOp);
    }

    #[test]
    fn single_block_extending_the_tip_is_appended_and_announced() {
        let chain = SharedChain::new();
        let next = next_block(&chain.latest(), vec!["hello".to_string()]);
        let outcome = handle_chain_response(&chain, vec![next.clone()]);
        assert_eq!(outcome, SyncOutcome::BroadcastLatest);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latest(), next);
    }

    #[test]
    fn single_block_far_ahead_triggers_a_full_query() {
        let chain = SharedChain::new();
        let their_chain = valid_chain(3);
        let their_tip = their_chain.last().unwrap().clone();
        let outcome = handle_chain_response(&chain, vec![their_tip]);
        assert_eq!(outcome, SyncOutcome::QueryAll);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn longer_chain_replaces_the_ledger_and_is_announced() {
        let chain = SharedChain::new();
        let their_chain = valid_chain(4);
        let their_tip = their_chain.last().unwrap().clone();
        let outcome = handle_chain_response(&chain, their_chain);
        assert_eq!(outcome, SyncOutcome::BroadcastLatest);
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.latest(), their_tip);
    }

    #[test]
    fn invalid_longer_chain_changes_nothing() {
        let chain = SharedChain::new();
        let mut their_chain = valid_chain(4);
        their_chain[2].header.previous_hash = "AB".repeat(32);
        let outcome = handle_chain_response(&chain, their_chain);
        assert_eq!(outcome, SyncOutcome::NoOp);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn queries_are_answered_on_the_same_connection() {
        use tokio::sync::mpsc;

        let chain = SharedChain::new();
        let peers = PeerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = peers.register("test".to_string(), tx);

        handle_message(&chain, &peers, id, PeerMessage::query_latest());
        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.kind, MessageKind::ResponseChain);
        let blocks: Vec<Block> = serde_json::from_str(reply.data.as_deref().unwrap()).unwrap();
        assert_eq!(blocks, vec![chain.latest()]);

        handle_message(&chain, &peers, id, PeerMessage::query_all());
        let reply = rx.try_recv().unwrap();
        let blocks: Vec<Block> = serde_json::from_str(reply.data.as_deref().unwrap()).unwrap();
        assert_eq!(blocks, chain.snapshot());
    }

    #[test]
    fn malformed_chain_payload_is_logged_and_dropped() {
        use tokio::sync::mpsc;

        let chain = SharedChain::new();
        let peers = PeerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = peers.register("test".to_string(), tx);

        let msg = PeerMessage {
            kind: MessageKind::ResponseChain,
            data: Some("not json".to_string()),
        };
        handle_message(&chain, &peers, id, msg);
        assert_eq!(chain.len(), 1);
        assert!(rx.try_recv().is_err());
    }
}
