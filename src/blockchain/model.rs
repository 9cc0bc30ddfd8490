use chrono::Utc;
use log::{debug, info, warn};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::PROTOCOL_VERSION;
use super::block::Block;
use super::merkle::merkle_root;
use super::pow::{get_difficulty, mine_header};
use super::validate::{validate_chain, validate_successor};

/// The in-memory ledger: an append-only run of validated blocks.
///
/// Created as `[genesis]`, grown one validated block at a time, and
/// only ever shortened by a whole-chain replacement that won the fork
/// choice. All access goes through these methods.
#[derive(Debug)]
pub struct Blockchain {
    chain: Vec<Block>,
}

impl Blockchain {
    /// A fresh ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// The tip: the most recently accepted block.
    pub fn latest(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds at least the genesis block")
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Validate `candidate` against the tip and append it.
    ///
    /// Returns false and leaves the ledger untouched when any
    /// consensus check fails; no partial mutation is observable.
    pub fn append(&mut self, candidate: Block) -> bool {
        match validate_successor(&candidate, self.latest()) {
            Ok(()) => {
                info!(
                    "CHAIN - accepted block #{} ({})",
                    candidate.header.index,
                    candidate.hash()
                );
                self.chain.push(candidate);
                true
            }
            Err(e) => {
                warn!("CHAIN - rejected block #{}: {e}", candidate.header.index);
                false
            }
        }
    }

    /// Fork choice: adopt `candidate` as the whole ledger.
    ///
    /// The candidate must be a valid chain from genesis and either
    /// strictly longer than ours, or of equal length with the coin
    /// flip favoring replacement. The equal-length flip avoids two
    /// equally long chains deterministically rejecting each other
    /// forever. Replacement is atomic; a loss leaves the ledger as is.
    pub fn replace_with<R: Rng>(&mut self, candidate: Vec<Block>, rng: &mut R) -> bool {
        if let Err(e) = validate_chain(&candidate) {
            warn!("CHAIN - rejected replacement chain: {e}");
            return false;
        }
        let adopt = candidate.len() > self.chain.len()
            || (candidate.len() == self.chain.len() && rng.gen_bool(0.5));
        if adopt {
            info!(
                "CHAIN - replacing ledger: {} -> {} blocks, new tip {}",
                self.chain.len(),
                candidate.len(),
                candidate.last().map(Block::hash).unwrap_or_default()
            );
            self.chain = candidate;
        } else {
            debug!(
                "CHAIN - keeping local ledger ({} blocks) over candidate ({} blocks)",
                self.chain.len(),
                candidate.len()
            );
        }
        adopt
    }

    pub fn is_valid(&self) -> bool {
        validate_chain(&self.chain).is_ok()
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-owner handle to the ledger, shared across the HTTP and p2p
/// tasks.
///
/// Mutations are serialized by the inner lock, so no two writes
/// interleave and readers never see a torn chain. Every successful
/// mutation bumps a version counter; an in-flight nonce search watches
/// it to notice that its template went stale.
#[derive(Clone)]
pub struct SharedChain {
    inner: Arc<Mutex<Blockchain>>,
    version: Arc<AtomicU64>,
}

impl SharedChain {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Blockchain::new())),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A cloned snapshot of the full chain.
    pub fn snapshot(&self) -> Vec<Block> {
        self.inner.lock().expect("mutex poisoned").blocks().to_vec()
    }

    /// A clone of the current tip.
    pub fn latest(&self) -> Block {
        self.inner.lock().expect("mutex poisoned").latest().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").len()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.lock().expect("mutex poisoned").is_valid()
    }

    /// Monotonic counter of successful mutations.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Validated append; bumps the version on success.
    pub fn append(&self, candidate: Block) -> bool {
        let mut ledger = self.inner.lock().expect("mutex poisoned");
        let accepted = ledger.append(candidate);
        if accepted {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        accepted
    }

    /// Fork choice with the production randomness source.
    pub fn replace(&self, candidate: Vec<Block>) -> bool {
        self.replace_with(candidate, &mut rand::thread_rng())
    }

    /// Fork choice with an injected randomness source, so tests can
    /// drive both sides of the equal-length coin flip.
    pub fn replace_with<R: Rng>(&self, candidate: Vec<Block>, rng: &mut R) -> bool {
        let mut ledger = self.inner.lock().expect("mutex poisoned");
        let adopted = ledger.replace_with(candidate, rng);
        if adopted {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        adopted
    }

    /// Mine and append the next block carrying `data`.
    ///
    /// CPU-bound and potentially long-running; callers must keep it
    /// off the message-serving path. If a competing block lands while
    /// the search runs, the search is cancelled and restarted against
    /// the new tip instead of committing a stale result. Returns None
    /// only when the freshly mined block is rejected with the ledger
    /// unchanged, which means the template itself was invalid.
    pub fn mine_next_block(&self, data: Vec<String>) -> Option<Block> {
        loop {
            let (previous_hash, next_index, difficulty, started_at) = {
                let ledger = self.inner.lock().expect("mutex poisoned");
                (
                    ledger.latest().hash(),
                    ledger.latest().header.index + 1,
                    get_difficulty(ledger.blocks()),
                    self.version(),
                )
            };
            let timestamp = Utc::now().timestamp();
            let root = merkle_root(&data);

            let header = mine_header(
                PROTOCOL_VERSION,
                next_index,
                &previous_hash,
                timestamp,
                &root,
                difficulty,
                || self.version() != started_at,
            );

            let Some(header) = header else {
                debug!("MINER - tip moved during the search, restarting at a new template");
                continue;
            };

            let block = Block {
                header,
                data: data.clone(),
            };
            if self.append(block.clone()) {
                info!(
                    "MINER - sealed block #{} (hash={}, nonce={}, difficulty={})",
                    block.header.index,
                    block.hash(),
                    block.header.nonce,
                    block.header.difficulty
                );
                return Some(block);
            }
            if self.version() == started_at {
                // Not a lost race: our own template failed validation.
                warn!("MINER - mined block #{} was rejected", block.header.index);
                return None;
            }
        }
    }
}

impl Default for SharedChain {
    fn default() -> Self {
        Self::new()
    }
}
