//! # Chaincode Stub
//!
//! The capability set a contract gets for the duration of one invocation.
//! There is no other way for contract code to reach ledger state, which is
//! what lets the whole contract layer be tested against the in-memory
//! ledger, or against a hand-written fake.
//!
//! ## Visibility
//!
//! Reads observe the committed snapshot the transaction was simulated
//! against. A transaction never sees its own pending writes, and never sees
//! anything written by a concurrently simulated transaction. Conflicts are
//! the commit phase's problem, not the contract's.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::Response;
use crate::identity::SerializedIdentity;

/// Errors surfaced by the stub's state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Keys must be non-empty.
    #[error("empty state key")]
    EmptyKey,

    /// Private collection names must be non-empty.
    #[error("empty private data collection name")]
    EmptyCollection,

    /// The caller's organization is not a member of the collection.
    #[error("access denied: {msp_id} cannot read private data collection {collection}")]
    AccessDenied {
        /// Collection that was read.
        collection: String,
        /// MSP id of the reader, or `<anonymous>`.
        msp_id: String,
    },

    /// The underlying store failed.
    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// Ledger capabilities available to a running chaincode.
///
/// Read methods take `&mut self` because every read is recorded in the
/// transaction's read set for commit-time validation.
pub trait ChaincodeStub {
    /// Id of the enclosing transaction.
    fn tx_id(&self) -> &str;

    /// Client-supplied transaction timestamp.
    fn tx_timestamp(&self) -> DateTime<Utc>;

    /// Channel the transaction runs on.
    fn channel_id(&self) -> &str;

    /// Credential material of the transaction creator, if any was supplied.
    fn creator(&self) -> Option<&SerializedIdentity>;

    /// Reads a public key from the current chaincode's namespace.
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StateError>;

    /// Writes a public key in the current chaincode's namespace.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError>;

    /// Reads a value from a private collection. Only members may read.
    fn get_private_data(
        &mut self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StateError>;

    /// Reads the SHA-256 hash of a private value without the value itself.
    /// Available to every organization on the channel.
    fn get_private_data_hash(
        &mut self,
        collection: &str,
        key: &str,
    ) -> Result<Option<[u8; 32]>, StateError>;

    /// Writes a value into a private collection.
    fn put_private_data(
        &mut self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StateError>;

    /// Emits a named event, published to listeners on commit.
    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), StateError>;

    /// Synchronously invokes another chaincode inside this transaction.
    ///
    /// The callee's reads and writes join this transaction's read/write set,
    /// so they commit or fail together with the caller's.
    fn invoke_chaincode(&mut self, name: &str, args: &[Vec<u8>], channel: &str) -> Response;
}
