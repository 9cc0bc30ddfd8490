use serde::{Deserialize, Serialize};

use super::PROTOCOL_VERSION;
use super::merkle::{ZERO_DIGEST, merkle_root, sha256_hex};

/// Unix timestamp of the genesis block (03/Jan/2009 18:15 UTC).
pub const GENESIS_TIMESTAMP: i64 = 1_231_006_505;

/// The single payload item committed by the genesis block.
pub const GENESIS_PAYLOAD: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

/// Block header carrying the chain linkage and the proof-of-work.
///
/// Field names follow the wire format: camelCase keys, digests as
/// uppercase 64-char hex, numbers as plain integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub version: String,
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: i64,
    pub merkle_root: String,
    pub difficulty: u32,
    pub nonce: u64,
}

impl BlockHeader {
    /// SHA-256 of the canonical field concatenation, as uppercase hex.
    ///
    /// The field order is fixed and every node must hash headers the
    /// same way, otherwise previousHash links never match across the
    /// network.
    pub fn compute_hash(&self) -> String {
        let preimage = format!(
            "{}{}{}{}{}{}{}",
            self.version,
            self.index,
            self.previous_hash,
            self.timestamp,
            self.merkle_root,
            self.difficulty,
            self.nonce
        );
        sha256_hex(preimage.as_bytes())
    }
}

/// A block: header plus an ordered list of opaque payload items.
/// Immutable once constructed; a corrected block is a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub data: Vec<String>,
}

impl Block {
    /// The hardcoded first block. Every valid chain starts with a
    /// byte-identical copy of this value.
    ///
    /// Genesis is exempt from the proof-of-work and timestamp rules;
    /// its difficulty and nonce are both zero.
    pub fn genesis() -> Self {
        let data = vec![GENESIS_PAYLOAD.to_string()];
        let header = BlockHeader {
            version: PROTOCOL_VERSION.to_string(),
            index: 0,
            previous_hash: ZERO_DIGEST.to_string(),
            timestamp: GENESIS_TIMESTAMP,
            merkle_root: merkle_root(&data),
            difficulty: 0,
            nonce: 0,
        };
        Self { header, data }
    }

    /// Hash of this block's header.
    pub fn hash(&self) -> String {
        self.header.compute_hash()
    }
}
