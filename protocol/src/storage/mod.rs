//! # Storage Module
//!
//! World state and the ledger that evolves it.
//!
//! ```text
//! state.rs       Versioned key space (public + private), state root
//! rwset.rs       Read/write set collected during simulation
//! simulation.rs  ChaincodeStub implementation backing one transaction
//! ledger.rs      MemoryLedger: simulate, validate, commit
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! TxRequest ─► simulate ─► Proposal { response, rwset, events }
//!                               │
//!                               ▼
//!                  commit: every read version still current?
//!                        yes ─► new WorldState snapshot, height + 1
//!                        no  ─► MvccReadConflict, nothing applied
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Snapshots are immutable.** Simulation borrows an `Arc<WorldState>`;
//!    commit builds the next one. Any number of transactions can simulate
//!    against the same snapshot, which is exactly how conflicting
//!    transactions arise on a real ledger.
//!
//! 2. **Versions are block heights.** Each commit is one block carrying one
//!    transaction, so the height that wrote a key is its version.
//!
//! 3. **Private values are hashed, not hidden, in the state root.** The
//!    root covers the SHA-256 of private values, the same thing every peer
//!    of a channel can see.

pub mod ledger;
pub mod rwset;
pub mod simulation;
pub mod state;

pub use ledger::{
    ChaincodeRegistry, CommitReceipt, LedgerError, MemoryLedger, Proposal, Simulation, TxRequest,
};
pub use rwset::ReadWriteSet;
pub use simulation::TxSimulation;
pub use state::{StateKey, Version, VersionedValue, WorldState};
