//! # Cryptographic Primitives
//!
//! Two hash functions, each with exactly one job:
//!
//! - **SHA-256** hashes private data. The hash is what the ledger publishes
//!   for every private write, and what a disclosure is checked against, so
//!   it has to match what every peer computes. No negotiating on this one.
//! - **BLAKE3** builds the world-state root. Purely internal, so we use the
//!   faster hash.
//!
//! Thin wrappers over the `sha2` and `blake3` crates. Nothing rolled here.

pub mod hash;

pub use hash::{merkle_root, sha256, sha256_hex};
