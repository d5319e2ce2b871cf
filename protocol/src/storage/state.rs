//! # World State
//!
//! A flat, ordered key space. Public keys are scoped by chaincode
//! namespace; private keys additionally by collection. Every value carries
//! the block height that last wrote it.
//!
//! ## State Root
//!
//! ```text
//! leaf(public)  = BLAKE3(key_bytes || value)
//! leaf(private) = BLAKE3(key_bytes || SHA-256(value))
//! root          = merkle_root(leaves in key order)
//! ```
//!
//! `BTreeMap` ordering makes the root independent of write order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::crypto::hash::{blake3_hash_multi, merkle_root, sha256};

/// Block height at which a value was written.
pub type Version = u64;

// ---------------------------------------------------------------------------
// StateKey
// ---------------------------------------------------------------------------

/// Fully qualified location of a value in world state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateKey {
    /// A public key in a chaincode namespace.
    Public { namespace: String, key: String },
    /// A key inside a private data collection of a chaincode namespace.
    Private {
        namespace: String,
        collection: String,
        key: String,
    },
}

impl StateKey {
    pub fn public(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        StateKey::Public {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    pub fn private(
        namespace: impl Into<String>,
        collection: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        StateKey::Private {
            namespace: namespace.into(),
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Whether the key lives in a private collection.
    pub fn is_private(&self) -> bool {
        matches!(self, StateKey::Private { .. })
    }

    fn to_hash_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::Public { namespace, key } => write!(f, "{namespace}/{key}"),
            StateKey::Private {
                namespace,
                collection,
                key,
            } => write!(f, "{namespace}/{collection}/{key}"),
        }
    }
}

// ---------------------------------------------------------------------------
// VersionedValue
// ---------------------------------------------------------------------------

/// A committed value and the height that wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

/// One committed snapshot of the ledger's key space.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    entries: BTreeMap<StateKey, VersionedValue>,
    height: u64,
}

impl WorldState {
    /// An empty state at height zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks committed so far.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Committed value at `key`.
    pub fn get(&self, key: &StateKey) -> Option<&VersionedValue> {
        self.entries.get(key)
    }

    /// Version of the committed value at `key`, `None` if absent.
    pub fn version(&self, key: &StateKey) -> Option<Version> {
        self.entries.get(key).map(|v| v.version)
    }

    /// Number of committed keys, public and private.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Public keys and values of one chaincode namespace, in key order.
    pub fn public_entries<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [u8])> + 'a {
        self.entries.iter().filter_map(move |(k, v)| match k {
            StateKey::Public { namespace: ns, key } if ns == namespace => {
                Some((key.as_str(), v.value.as_slice()))
            }
            _ => None,
        })
    }

    /// Writes `writes` as a new block and advances the height.
    pub(crate) fn apply_block(&mut self, writes: &BTreeMap<StateKey, Vec<u8>>) -> u64 {
        self.height += 1;
        let version = self.height;
        for (key, value) in writes {
            self.entries.insert(
                key.clone(),
                VersionedValue {
                    value: value.clone(),
                    version,
                },
            );
        }
        version
    }

    /// BLAKE3 Merkle root over every committed entry.
    pub fn root_hash(&self) -> [u8; 32] {
        let leaves: Vec<[u8; 32]> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let key_bytes = key.to_hash_bytes();
                if key.is_private() {
                    let hidden = sha256(&entry.value);
                    blake3_hash_multi(&[key_bytes.as_slice(), hidden.as_slice()])
                } else {
                    blake3_hash_multi(&[key_bytes.as_slice(), entry.value.as_slice()])
                }
            })
            .collect();
        merkle_root(&leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writes(pairs: &[(StateKey, &str)]) -> BTreeMap<StateKey, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| (k.clone(), v.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn empty_state_root_is_zero() {
        assert_eq!(WorldState::new().root_hash(), [0u8; 32]);
        assert_eq!(WorldState::new().height(), 0);
    }

    #[test]
    fn apply_block_versions_values_by_height() {
        let mut state = WorldState::new();
        let k = StateKey::public("erc20", "alice");
        state.apply_block(&writes(&[(k.clone(), "10")]));
        assert_eq!(state.version(&k), Some(1));

        state.apply_block(&writes(&[(k.clone(), "7")]));
        assert_eq!(state.version(&k), Some(2));
        assert_eq!(state.get(&k).unwrap().value, b"7");
        assert_eq!(state.height(), 2);
    }

    #[test]
    fn root_is_independent_of_write_order() {
        let a = StateKey::public("erc20", "alice");
        let b = StateKey::public("erc20", "bob");

        let mut s1 = WorldState::new();
        s1.apply_block(&writes(&[(a.clone(), "1"), (b.clone(), "2")]));
        let mut s2 = WorldState::new();
        s2.apply_block(&writes(&[(b, "2"), (a, "1")]));

        assert_eq!(s1.root_hash(), s2.root_hash());
    }

    #[test]
    fn root_changes_with_private_value() {
        let k = StateKey::private("privateData", "_implicit_org_A", "id");
        let mut s1 = WorldState::new();
        s1.apply_block(&writes(&[(k.clone(), "one")]));
        let mut s2 = WorldState::new();
        s2.apply_block(&writes(&[(k, "two")]));
        assert_ne!(s1.root_hash(), s2.root_hash());
    }

    #[test]
    fn public_entries_are_scoped_to_namespace() {
        let mut state = WorldState::new();
        state.apply_block(&writes(&[
            (StateKey::public("erc20", "alice"), "5"),
            (StateKey::public("privateData", "marketOwner"), "Intage"),
            (StateKey::private("erc20", "c", "hidden"), "x"),
        ]));
        let keys: Vec<&str> = state.public_entries("erc20").map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alice"]);
    }

    #[test]
    fn state_key_display() {
        assert_eq!(StateKey::public("erc20", "P").to_string(), "erc20/P");
        assert_eq!(
            StateKey::private("privateData", "_implicit_org_A", "tx1").to_string(),
            "privateData/_implicit_org_A/tx1"
        );
    }
}
