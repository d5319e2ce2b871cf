// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # DataMarket Protocol: Ledger Host Runtime
//!
//! Everything a DataMarket contract needs from the ledger it runs on, and
//! nothing it doesn't. Contracts never touch storage, identities, or other
//! contracts directly; they go through the capability set defined here.
//!
//! ## Architecture
//!
//! - **chaincode**: The `Chaincode` trait a contract implements, the
//!   `ChaincodeStub` trait it calls back into, and the shim `Response`.
//! - **identity**: Credential material (serialized identities and the
//!   certificates inside them).
//! - **crypto**: SHA-256 for private data hashes, BLAKE3 for state roots.
//! - **storage**: Versioned world state and the in-memory ledger that
//!   simulates transactions and commits them with MVCC validation.
//! - **config**: Chaincode names, state keys, and protocol constants.
//!
//! ## Execution Model
//!
//! 1. A client submits a request to a named chaincode.
//! 2. The ledger simulates it against an immutable snapshot, collecting
//!    a read/write set and the events it emitted.
//! 3. Commit re-validates every read version. One stale read and the whole
//!    transaction is rejected; nothing is ever partially applied.

pub mod chaincode;
pub mod config;
pub mod crypto;
pub mod identity;
pub mod storage;
