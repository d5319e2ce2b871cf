//! # Transaction Simulation
//!
//! `TxSimulation` is the `ChaincodeStub` every contract sees. It reads from
//! one immutable snapshot, records every read version and every write, and
//! collects events. Nothing it does touches committed state.
//!
//! Cross-chaincode calls reuse the same simulation: the namespace switches
//! to the callee for the duration of the call and switches back afterwards,
//! so the callee's effects land in the caller's read/write set.

use chrono::{DateTime, Utc};

use super::ledger::ChaincodeRegistry;
use super::rwset::ReadWriteSet;
use super::state::{StateKey, WorldState};
use crate::chaincode::{ChaincodeEvent, ChaincodeStub, Response, StateError};
use crate::config::implicit_collection_owner;
use crate::crypto::hash::sha256;
use crate::identity::SerializedIdentity;

/// Deepest chain of nested chaincode calls a transaction may build.
const MAX_CALL_DEPTH: usize = 8;

/// One in-flight transaction.
pub struct TxSimulation<'a> {
    snapshot: &'a WorldState,
    registry: &'a ChaincodeRegistry,
    channel: &'a str,
    namespace: String,
    tx_id: String,
    timestamp: DateTime<Utc>,
    creator: Option<SerializedIdentity>,
    rwset: ReadWriteSet,
    events: Vec<ChaincodeEvent>,
    depth: usize,
}

impl<'a> TxSimulation<'a> {
    pub(crate) fn new(
        snapshot: &'a WorldState,
        registry: &'a ChaincodeRegistry,
        channel: &'a str,
        namespace: impl Into<String>,
        tx_id: String,
        timestamp: DateTime<Utc>,
        creator: Option<SerializedIdentity>,
    ) -> Self {
        Self {
            snapshot,
            registry,
            channel,
            namespace: namespace.into(),
            tx_id,
            timestamp,
            creator,
            rwset: ReadWriteSet::new(),
            events: Vec::new(),
            depth: 0,
        }
    }

    /// Namespace currently being read and written.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Consumes the simulation, returning its read/write set and events.
    pub(crate) fn finish(self) -> (ReadWriteSet, Vec<ChaincodeEvent>) {
        (self.rwset, self.events)
    }

    fn read(&mut self, key: StateKey) -> Option<Vec<u8>> {
        let entry = self.snapshot.get(&key);
        self.rwset.record_read(key, entry.map(|e| e.version));
        entry.map(|e| e.value.clone())
    }

    fn private_key(&self, collection: &str, key: &str) -> Result<StateKey, StateError> {
        if collection.is_empty() {
            return Err(StateError::EmptyCollection);
        }
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        Ok(StateKey::private(self.namespace.clone(), collection, key))
    }

    /// Implicit organization collections are readable by their own
    /// organization only.
    fn check_read_access(&self, collection: &str) -> Result<(), StateError> {
        let Some(owner) = implicit_collection_owner(collection) else {
            return Ok(());
        };
        let reader = self.creator.as_ref().map(|c| c.msp_id.as_str());
        if reader == Some(owner) {
            Ok(())
        } else {
            Err(StateError::AccessDenied {
                collection: collection.to_string(),
                msp_id: reader.unwrap_or("<anonymous>").to_string(),
            })
        }
    }
}

impl ChaincodeStub for TxSimulation<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn channel_id(&self) -> &str {
        self.channel
    }

    fn creator(&self) -> Option<&SerializedIdentity> {
        self.creator.as_ref()
    }

    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        let key = StateKey::public(self.namespace.clone(), key);
        Ok(self.read(key))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        let key = StateKey::public(self.namespace.clone(), key);
        self.rwset.record_write(key, value);
        Ok(())
    }

    fn get_private_data(
        &mut self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StateError> {
        let state_key = self.private_key(collection, key)?;
        self.check_read_access(collection)?;
        Ok(self.read(state_key))
    }

    fn get_private_data_hash(
        &mut self,
        collection: &str,
        key: &str,
    ) -> Result<Option<[u8; 32]>, StateError> {
        let state_key = self.private_key(collection, key)?;
        Ok(self.read(state_key).map(|value| sha256(&value)))
    }

    fn put_private_data(
        &mut self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StateError> {
        let state_key = self.private_key(collection, key)?;
        self.rwset.record_write(state_key, value);
        Ok(())
    }

    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), StateError> {
        if name.is_empty() {
            return Err(StateError::EmptyKey);
        }
        self.events.push(ChaincodeEvent {
            chaincode: self.namespace.clone(),
            tx_id: self.tx_id.clone(),
            name: name.to_string(),
            payload,
        });
        Ok(())
    }

    fn invoke_chaincode(&mut self, name: &str, args: &[Vec<u8>], channel: &str) -> Response {
        if channel != self.channel {
            return Response::error(format!(
                "cannot invoke {name} on channel {channel}: transaction runs on {}",
                self.channel
            ));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Response::error(format!(
                "cannot invoke {name}: call depth limit {MAX_CALL_DEPTH} reached"
            ));
        }
        let registry = self.registry;
        let Some(chaincode) = registry.get(name) else {
            return Response::error(format!("chaincode {name} is not deployed"));
        };

        tracing::debug!(
            tx_id = %self.tx_id,
            caller = %self.namespace,
            callee = name,
            "cross-chaincode invocation"
        );

        let caller_namespace = std::mem::replace(&mut self.namespace, name.to_string());
        self.depth += 1;
        let response = chaincode.invoke(self, args);
        self.depth -= 1;
        self.namespace = caller_namespace;
        response
    }
}
