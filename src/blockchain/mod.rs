pub mod block;
pub mod merkle;
pub mod model;
pub mod pow;
pub mod validate;

#[cfg(test)]
pub mod testutil;

pub use block::{Block, BlockHeader};
pub use model::{Blockchain, SharedChain};

/// Header version stamped on every locally produced block. Fixed by
/// the protocol, not the crate version; nodes hashing different
/// version strings can never agree on a chain.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Target seconds between blocks.
pub const BLOCK_GENERATION_INTERVAL_SECS: i64 = 10;

/// Blocks between difficulty recalculations.
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// Tolerated clock skew (seconds) when judging block timestamps.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;
