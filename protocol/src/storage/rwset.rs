//! # Read/Write Sets
//!
//! What a simulated transaction saw and what it wants to change. Commit
//! validation is nothing more than checking that every recorded read
//! version is still the current one.

use std::collections::BTreeMap;

use super::state::{StateKey, Version, WorldState};

/// Reads (with the version observed) and writes of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadWriteSet {
    reads: BTreeMap<StateKey, Option<Version>>,
    writes: BTreeMap<StateKey, Vec<u8>>,
}

impl ReadWriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read. `None` means the key was absent. Only the first read
    /// of a key is kept; the snapshot cannot change under a simulation.
    pub fn record_read(&mut self, key: StateKey, version: Option<Version>) {
        self.reads.entry(key).or_insert(version);
    }

    /// Records a write. Later writes to the same key replace earlier ones.
    pub fn record_write(&mut self, key: StateKey, value: Vec<u8>) {
        self.writes.insert(key, value);
    }

    pub fn reads(&self) -> &BTreeMap<StateKey, Option<Version>> {
        &self.reads
    }

    pub fn writes(&self) -> &BTreeMap<StateKey, Vec<u8>> {
        &self.writes
    }

    /// `true` when the transaction wrote nothing.
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Returns the first key whose committed version differs from the one
    /// read during simulation.
    pub fn first_stale_read(&self, state: &WorldState) -> Option<&StateKey> {
        self.reads
            .iter()
            .find(|(key, read_version)| state.version(key) != **read_version)
            .map(|(key, _)| key)
    }
}
