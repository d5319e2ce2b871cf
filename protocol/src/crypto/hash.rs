//! # Hashing Utilities
//!
//! `sha256` is the private data digest: the runtime stores it next to every
//! private write and hands it out through `get_private_data_hash`, so a
//! disclosure can be checked without the verifier ever having seen the
//! plaintext. Returns a fixed `[u8; 32]` because the only thing callers do
//! with it is compare it byte-for-byte.
//!
//! `blake3_hash_multi` and `merkle_root` only feed the
//! world-state root reported by the ledger.

use sha2::{Digest, Sha256};

use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the SHA-256 digest of `data`.
///
/// # Example
///
/// ```
/// use datamarket_protocol::crypto::sha256;
///
/// let hash = sha256(b"private payload");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; HASH_OUTPUT_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 of `data`, hex-encoded. Used for transaction ids and error messages.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hash several byte slices as if they were concatenated, without building
/// the concatenation.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Binary BLAKE3 Merkle root over `leaves`.
///
/// An odd node at any level is paired with itself. A single leaf is also
/// paired with itself, so the root is always a hash output and never a raw
/// leaf. An empty input returns all zeros.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    if leaves.len() == 1 {
        return blake3_hash_multi(&[leaves[0].as_slice(), leaves[0].as_slice()]);
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                blake3_hash_multi(&[pair[0].as_slice(), right.as_slice()])
            })
            .collect();
    }

    level[0]
}
