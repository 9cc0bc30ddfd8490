use sha2::{Digest, Sha256};

/// Length of a rendered SHA-256 digest (32 bytes as hex).
pub const DIGEST_LEN: usize = 64;

/// The all-zero digest, used for "no predecessor" and "no payload".
pub const ZERO_DIGEST: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// SHA-256 of `data`, rendered as uppercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode_upper(hasher.finalize())
}

/// Root of a binary Merkle tree over `items`, in insertion order.
///
/// Leaves are `sha256_hex` of each item; internal nodes hash the
/// concatenation of their two child digests. A lone node at any level
/// is paired with itself. An empty list yields the all-zero digest
/// (a policy stand-in for "no root", not a real hash).
pub fn merkle_root(items: &[String]) -> String {
    if items.is_empty() {
        return ZERO_DIGEST.to_string();
    }

    let mut level: Vec<String> = items.iter().map(|i| sha256_hex(i.as_bytes())).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            next.push(sha256_hex(format!("{left}{right}").as_bytes()));
        }
        level = next;
    }
    level.remove(0)
}
