//! Shared helpers for consensus tests. Compiled only for `cfg(test)`.

use chrono::Utc;

use super::PROTOCOL_VERSION;
use super::block::{Block, BlockHeader};
use super::merkle::{ZERO_DIGEST, merkle_root};

/// A difficulty-0 successor of `prev`, stamped with the current time.
/// Nonce 0 already satisfies a zero difficulty, so no search is needed.
pub fn next_block(prev: &Block, data: Vec<String>) -> Block {
    let header = BlockHeader {
        version: PROTOCOL_VERSION.to_string(),
        index: prev.header.index + 1,
        previous_hash: prev.hash(),
        timestamp: Utc::now().timestamp(),
        merkle_root: merkle_root(&data),
        difficulty: 0,
        nonce: 0,
    };
    Block { header, data }
}

/// Genesis plus `extra` valid difficulty-0 blocks.
pub fn valid_chain(extra: usize) -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    for i in 0..extra {
        let next = next_block(chain.last().unwrap(), vec![format!("payload {i}")]);
        chain.push(next);
    }
    chain
}

/// A free-standing dummy block for pure difficulty-schedule tests.
/// Not a valid chain member; only index, timestamp and difficulty matter.
pub fn dummy_block(index: u64, timestamp: i64, difficulty: u32) -> Block {
    let header = BlockHeader {
        version: PROTOCOL_VERSION.to_string(),
        index,
        previous_hash: ZERO_DIGEST.to_string(),
        timestamp,
        merkle_root: ZERO_DIGEST.to_string(),
        difficulty,
        nonce: 0,
    };
    Block { header, data: vec![] }
}

/// `len` dummy blocks spaced `interval_secs` apart, all at `difficulty`.
pub fn chain_with_interval(len: usize, interval_secs: i64, difficulty: u32) -> Vec<Block> {
    let base = 1_600_000_000;
    (0..len)
        .map(|i| dummy_block(i as u64, base + i as i64 * interval_secs, difficulty))
        .collect()
}
