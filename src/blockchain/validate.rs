use chrono::Utc;
use thiserror::Error;

use super::MAX_CLOCK_SKEW_SECS;
use super::block::Block;
use super::merkle::{DIGEST_LEN, ZERO_DIGEST, merkle_root};
use super::pow::hash_meets_difficulty;

/// Why a block or chain was rejected. Checks short-circuit, so the
/// error names the first rule that failed; nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed {0} field")]
    Structure(&'static str),
    #[error("expected index {expected}, got {got}")]
    Index { expected: u64, got: u64 },
    #[error("previousHash does not match the predecessor's hash")]
    PreviousHash,
    #[error("merkle root does not match the block payload")]
    MerkleRoot,
    #[error("timestamp outside the accepted window")]
    Timestamp,
    #[error("header hash does not satisfy difficulty {0}")]
    ProofOfWork(u32),
    #[error("chain does not start at the genesis block")]
    Genesis,
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == DIGEST_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Structural checks beyond what typed decoding already guarantees:
/// digest fields must look like fixed-length hex. Fails closed.
pub fn check_structure(block: &Block) -> Result<(), ValidationError> {
    if !is_hex_digest(&block.header.previous_hash) {
        return Err(ValidationError::Structure("previousHash"));
    }
    if !is_hex_digest(&block.header.merkle_root) {
        return Err(ValidationError::Structure("merkleRoot"));
    }
    Ok(())
}

/// Consensus validity of `candidate` as the immediate successor of
/// `predecessor`, against the local clock.
pub fn validate_successor(candidate: &Block, predecessor: &Block) -> Result<(), ValidationError> {
    validate_successor_at(candidate, predecessor, Utc::now().timestamp())
}

/// Like [`validate_successor`], with the current time injected so the
/// timestamp window is testable.
pub(crate) fn validate_successor_at(
    candidate: &Block,
    predecessor: &Block,
    now: i64,
) -> Result<(), ValidationError> {
    check_structure(candidate)?;

    let expected = predecessor.header.index + 1;
    if candidate.header.index != expected {
        return Err(ValidationError::Index {
            expected,
            got: candidate.header.index,
        });
    }

    if candidate.header.previous_hash != predecessor.header.compute_hash() {
        return Err(ValidationError::PreviousHash);
    }

    let expected_root = if candidate.data.is_empty() {
        ZERO_DIGEST.to_string()
    } else {
        merkle_root(&candidate.data)
    };
    if candidate.header.merkle_root != expected_root {
        return Err(ValidationError::MerkleRoot);
    }

    // Tolerate up to MAX_CLOCK_SKEW_SECS of drift in either direction:
    // not implausibly before the predecessor, not in the local future.
    if candidate.header.timestamp <= predecessor.header.timestamp - MAX_CLOCK_SKEW_SECS
        || candidate.header.timestamp - MAX_CLOCK_SKEW_SECS >= now
    {
        return Err(ValidationError::Timestamp);
    }

    if !hash_meets_difficulty(&candidate.header.compute_hash(), candidate.header.difficulty) {
        return Err(ValidationError::ProofOfWork(candidate.header.difficulty));
    }

    Ok(())
}

/// Whole-chain validity from genesis. Each link is checked against its
/// predecessor within the candidate chain, not the local ledger; any
/// failure invalidates the whole chain.
pub fn validate_chain(chain: &[Block]) -> Result<(), ValidationError> {
    match chain.first() {
        Some(first) if *first == Block::genesis() => {}
        _ => return Err(ValidationError::Genesis),
    }
    for pair in chain.windows(2) {
        validate_successor(&pair[1], &pair[0])?;
    }
    Ok(())
}
