use super::block::{Block, BlockHeader};
use super::{BLOCK_GENERATION_INTERVAL_SECS, DIFFICULTY_ADJUSTMENT_INTERVAL};

/// How many nonces to try between checks of the cancellation signal.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// True iff `hash` (hex) has at least `difficulty` leading zero bits.
///
/// Difficulty counts bits, not hex digits, so each nibble contributes
/// up to four zeros before the first set bit ends the run.
pub fn hash_meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let mut zeros = 0u32;
    for c in hash.chars() {
        let Some(nibble) = c.to_digit(16) else {
            return false;
        };
        if nibble == 0 {
            zeros += 4;
        } else {
            zeros += nibble.leading_zeros() - 28;
            return zeros >= difficulty;
        }
        if zeros >= difficulty {
            return true;
        }
    }
    zeros >= difficulty
}

/// Brute-force nonce search for a header satisfying `difficulty`.
///
/// Starts at nonce 0 and rehashes until the proof-of-work predicate
/// holds. The search is unbounded and CPU-bound; `cancelled` is
/// consulted every `CANCEL_CHECK_INTERVAL` nonces and aborts the
/// search with `None` and no side effects, leaving the caller free to
/// restart against a new tip.
pub fn mine_header(
    version: &str,
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    merkle_root: &str,
    difficulty: u32,
    cancelled: impl Fn() -> bool,
) -> Option<BlockHeader> {
    let mut header = BlockHeader {
        version: version.to_string(),
        index,
        previous_hash: previous_hash.to_string(),
        timestamp,
        merkle_root: merkle_root.to_string(),
        difficulty,
        nonce: 0,
    };
    loop {
        if hash_meets_difficulty(&header.compute_hash(), difficulty) {
            return Some(header);
        }
        if header.nonce % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
            return None;
        }
        header.nonce = header.nonce.wrapping_add(1);
    }
}

/// Difficulty for the next block on `chain`.
///
/// Locked to the tip's difficulty between retarget points; recomputed
/// whenever the tip index is a positive multiple of the adjustment
/// interval.
pub fn get_difficulty(chain: &[Block]) -> u32 {
    let latest = chain.last().expect("chain always holds genesis");
    if latest.header.index % DIFFICULTY_ADJUSTMENT_INTERVAL == 0 && latest.header.index != 0 {
        get_adjusted_difficulty(latest, chain)
    } else {
        latest.header.difficulty
    }
}

/// Retargeted difficulty at an adjustment boundary.
///
/// Compares the time the last adjustment window actually took against
/// the expected `interval × block time` and nudges the difficulty one
/// step when mining ran more than twice as fast or slow, floored so it
/// never goes negative.
fn get_adjusted_difficulty(latest: &Block, chain: &[Block]) -> u32 {
    let prev_adjustment = &chain[chain.len() - 1 - DIFFICULTY_ADJUSTMENT_INTERVAL as usize];
    let time_expected =
        BLOCK_GENERATION_INTERVAL_SECS * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
    let time_taken = latest.header.timestamp - prev_adjustment.header.timestamp;

    if time_taken < time_expected / 2 {
        prev_adjustment.header.difficulty + 1
    } else if time_taken > time_expected * 2 {
        prev_adjustment.header.difficulty.saturating_sub(1)
    } else {
        prev_adjustment.header.difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::PROTOCOL_VERSION;
    use crate::blockchain::merkle::ZERO_DIGEST;
    use crate::blockchain::testutil::chain_with_interval;

    #[test]
    fn zero_difficulty_accepts_any_hash() {
        assert!(hash_meets_difficulty("FFFF", 0));
        assert!(hash_meets_difficulty("", 0));
    }

    #[test]
    fn leading_zero_bits_are_counted_per_nibble() {
        // '0' = 4 zero bits, '1' = 3 more before its set bit
        assert!(hash_meets_difficulty("0F", 4));
        assert!(!hash_meets_difficulty("0F", 5));
        assert!(hash_meets_difficulty("1F", 3));
        assert!(!hash_meets_difficulty("1F", 4));
        assert!(hash_meets_difficulty("001F", 11));
        assert!(!hash_meets_difficulty("001F", 12));
        assert!(hash_meets_difficulty("8000", 0));
        assert!(!hash_meets_difficulty("8000", 1));
    }

    #[test]
    fn non_hex_input_never_meets_difficulty() {
        assert!(!hash_meets_difficulty("0G00", 4));
    }

    #[test]
    fn mining_at_difficulty_zero_returns_nonce_zero() {
        let header = mine_header(
            PROTOCOL_VERSION,
            1,
            ZERO_DIGEST,
            GENESIS_LIKE_TS,
            ZERO_DIGEST,
            0,
            || false,
        )
        .expect("difficulty 0 always succeeds");
        assert_eq!(header.nonce, 0);
        assert_eq!(header.index, 1);
    }

    #[test]
    fn mined_header_satisfies_its_difficulty() {
        let difficulty = 8;
        let header = mine_header(
            PROTOCOL_VERSION,
            1,
            ZERO_DIGEST,
            GENESIS_LIKE_TS,
            ZERO_DIGEST,
            difficulty,
            || false,
        )
        .expect("search not cancelled");
        assert!(hash_meets_difficulty(&header.compute_hash(), difficulty));
        assert_eq!(header.difficulty, difficulty);
    }

    #[test]
    fn cancelled_search_aborts_with_none() {
        // Difficulty far beyond what a few nonces can satisfy; the
        // cancellation fires on the first check.
        let header = mine_header(
            PROTOCOL_VERSION,
            1,
            ZERO_DIGEST,
            GENESIS_LIKE_TS,
            ZERO_DIGEST,
            200,
            || true,
        );
        assert!(header.is_none());
    }

    const GENESIS_LIKE_TS: i64 = 1_231_006_505;

    #[test]
    fn difficulty_is_locked_between_retarget_points() {
        // Tip index 5: not an adjustment boundary
        let chain = chain_with_interval(6, BLOCK_GENERATION_INTERVAL_SECS, 3);
        assert_eq!(get_difficulty(&chain), 3);
    }

    #[test]
    fn retarget_raises_difficulty_after_a_fast_window() {
        // 11 blocks, each mined in under half the target interval
        let chain = chain_with_interval(11, BLOCK_GENERATION_INTERVAL_SECS / 4, 3);
        assert_eq!(get_difficulty(&chain), 4);
    }

    #[test]
    fn retarget_lowers_difficulty_after_a_slow_window() {
        let chain = chain_with_interval(11, BLOCK_GENERATION_INTERVAL_SECS * 4, 3);
        assert_eq!(get_difficulty(&chain), 2);
    }

    #[test]
    fn retarget_keeps_difficulty_on_schedule() {
        let chain = chain_with_interval(11, BLOCK_GENERATION_INTERVAL_SECS, 3);
        assert_eq!(get_difficulty(&chain), 3);
    }

    #[test]
    fn retarget_never_goes_negative() {
        let chain = chain_with_interval(11, BLOCK_GENERATION_INTERVAL_SECS * 4, 0);
        assert_eq!(get_difficulty(&chain), 0);
    }
}
