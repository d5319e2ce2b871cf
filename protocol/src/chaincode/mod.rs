//! # Chaincode Interface
//!
//! The seam between a contract and the ledger that hosts it.
//!
//! ```text
//! client ──► MemoryLedger::simulate ──► Chaincode::invoke(stub, args)
//!                                            │
//!                                            ├─► stub.get_state / put_state
//!                                            ├─► stub.*_private_data*
//!                                            ├─► stub.set_event
//!                                            └─► stub.invoke_chaincode ──► other Chaincode
//! ```
//!
//! Arguments arrive as raw byte strings with the function name first, the
//! same shape the ledger uses for cross-contract calls. Contracts are
//! expected to parse them once into a typed invocation and never look at
//! raw bytes again.

pub mod stub;

use serde::{Deserialize, Serialize};

use crate::config::{STATUS_ERROR, STATUS_ERROR_THRESHOLD, STATUS_OK};

pub use stub::{ChaincodeStub, StateError};

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The outcome of a chaincode invocation.
///
/// Status 200 is success; anything at or above 400 is an error, and the
/// ledger refuses to commit the transaction that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Shim status code.
    pub status: i32,
    /// Error description. Empty on success.
    pub message: String,
    /// Result bytes. Empty on error.
    pub payload: Vec<u8>,
}

impl Response {
    /// A successful response carrying `payload`.
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: STATUS_OK,
            message: String::new(),
            payload: payload.into(),
        }
    }

    /// A generic failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self::error_with_status(STATUS_ERROR, message)
    }

    /// A failure with a specific status. Statuses below the error
    /// threshold are clamped to the generic error status.
    pub fn error_with_status(status: i32, message: impl Into<String>) -> Self {
        let status = if status < STATUS_ERROR_THRESHOLD {
            STATUS_ERROR
        } else {
            status
        };
        Self {
            status,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    /// `true` for a status below the error threshold.
    pub fn is_ok(&self) -> bool {
        self.status < STATUS_ERROR_THRESHOLD
    }

    /// The payload as UTF-8, lossily.
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A named event emitted by a chaincode during simulation.
///
/// Events only become visible to listeners once the transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    /// Chaincode that emitted the event.
    pub chaincode: String,
    /// Transaction that carried it.
    pub tx_id: String,
    /// Event name, e.g. `transferEvent`.
    pub name: String,
    /// Encoded event body.
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Chaincode
// ---------------------------------------------------------------------------

/// A contract deployable on the ledger.
///
/// Implementations hold no per-transaction state: everything they read or
/// write goes through the stub, so the same instance serves every
/// concurrent simulation.
pub trait Chaincode: Send + Sync {
    /// Called once when the chaincode is instantiated.
    fn init(&self, stub: &mut dyn ChaincodeStub, args: &[Vec<u8>]) -> Response;

    /// Called for every transaction addressed to this chaincode, and for
    /// every cross-chaincode call into it.
    fn invoke(&self, stub: &mut dyn ChaincodeStub, args: &[Vec<u8>]) -> Response;
}
