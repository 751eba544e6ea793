#![forbid(unsafe_code)]

//! 64-bit polynomial accumulator shared by identifier and content hashing.

const SEED: u64 = 5351;

/// `h = h * b + b` over every byte, wrapping at 2^64.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    bytes.iter().fold(SEED, |h, &b| {
        let b = u64::from(b);
        h.wrapping_mul(b).wrapping_add(b)
    })
}

/// Identifier hash of a sanitized (ASCII) asset name.
pub fn hash_name(name: &str) -> u64 {
    hash_bytes(name.as_bytes())
}
