//! # MemoryLedger
//!
//! An in-process ledger with the execute-then-validate lifecycle of a
//! permissioned chain:
//!
//! 1. **Simulate**: run the chaincode against the latest committed
//!    snapshot. Produces a [`Proposal`]: the response plus every read
//!    (with version), write, and event.
//! 2. **Validate**: at commit time, compare every read version against
//!    the current state. A single mismatch rejects the whole transaction.
//! 3. **Commit**: apply all writes as one new block and publish events.
//!
//! Commits are serialized by the state write lock; simulations never take
//! it for longer than it takes to clone an `Arc`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::rwset::ReadWriteSet;
use super::simulation::TxSimulation;
use super::state::WorldState;
use crate::chaincode::{Chaincode, ChaincodeEvent, ChaincodeStub, Response};
use crate::crypto::hash::sha256_hex;
use crate::identity::SerializedIdentity;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the ledger's simulate/commit pipeline.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No chaincode is deployed under this name.
    #[error("chaincode not deployed: {0}")]
    UnknownChaincode(String),

    /// The chaincode returned an error response; nothing was committed.
    #[error("endorsement failed for tx {tx_id} (status {status}): {message}")]
    Endorsement {
        tx_id: String,
        status: i32,
        message: String,
    },

    /// A key read during simulation changed before commit.
    #[error("mvcc read conflict for tx {tx_id} on key {key}")]
    MvccReadConflict { tx_id: String, key: String },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Chaincodes deployed on a channel, by name.
#[derive(Clone, Default)]
pub struct ChaincodeRegistry {
    chaincodes: HashMap<String, Arc<dyn Chaincode>>,
}

impl ChaincodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `chaincode` under `name`, replacing any previous deployment.
    pub fn register(mut self, name: impl Into<String>, chaincode: impl Chaincode + 'static) -> Self {
        self.chaincodes.insert(name.into(), Arc::new(chaincode));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Chaincode>> {
        self.chaincodes.get(name)
    }

    /// Deployed chaincode names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chaincodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Requests & Results
// ---------------------------------------------------------------------------

/// A transaction proposal as a client submits it.
#[derive(Debug, Clone)]
pub struct TxRequest {
    /// Target chaincode.
    pub chaincode: String,
    /// Function name followed by its arguments.
    pub args: Vec<Vec<u8>>,
    /// Credential material of the submitter.
    pub creator: Option<SerializedIdentity>,
    /// Client timestamp. Defaults to the simulation time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl TxRequest {
    /// Starts a request for `function` on `chaincode`.
    pub fn new(chaincode: impl Into<String>, function: &str) -> Self {
        Self {
            chaincode: chaincode.into(),
            args: vec![function.as_bytes().to_vec()],
            creator: None,
            timestamp: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    /// Appends several arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_vec()));
        self
    }

    /// Sets the submitting identity.
    pub fn creator(mut self, creator: SerializedIdentity) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Pins the transaction timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The function name, lossily decoded.
    pub fn function(&self) -> String {
        self.args
            .first()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .unwrap_or_default()
    }
}

/// Effects of one simulated transaction, ready for validation.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub tx_id: String,
    pub chaincode: String,
    /// Height of the snapshot the transaction was simulated against.
    pub snapshot_height: u64,
    pub rwset: ReadWriteSet,
    pub events: Vec<ChaincodeEvent>,
}

/// A simulated transaction and the chaincode's response to it.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub simulation: Simulation,
    pub response: Response,
}

impl Proposal {
    pub fn tx_id(&self) -> &str {
        &self.simulation.tx_id
    }
}

/// Proof that a transaction made it into a block.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub tx_id: String,
    pub block_number: u64,
    /// Payload of the endorsed response.
    pub payload: Vec<u8>,
    /// Events, now visible to listeners.
    pub events: Vec<ChaincodeEvent>,
}

#[derive(Clone, Copy)]
enum Entry {
    Init,
    Invoke,
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// Single-channel in-memory ledger.
pub struct MemoryLedger {
    channel: String,
    registry: ChaincodeRegistry,
    state: RwLock<Arc<WorldState>>,
}

impl MemoryLedger {
    /// Creates an empty ledger for `channel` with the given deployments.
    pub fn new(channel: impl Into<String>, registry: ChaincodeRegistry) -> Self {
        Self {
            channel: channel.into(),
            registry,
            state: RwLock::new(Arc::new(WorldState::new())),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn registry(&self) -> &ChaincodeRegistry {
        &self.registry
    }

    /// The latest committed snapshot.
    pub fn snapshot(&self) -> Arc<WorldState> {
        Arc::clone(&self.state.read())
    }

    /// Number of committed blocks.
    pub fn height(&self) -> u64 {
        self.state.read().height()
    }

    /// Root hash of the latest committed state.
    pub fn state_root(&self) -> [u8; 32] {
        self.snapshot().root_hash()
    }

    /// Simulates a call to the chaincode's `init`.
    pub fn simulate_init(&self, request: &TxRequest) -> Result<Proposal, LedgerError> {
        self.simulate_entry(request, Entry::Init)
    }

    /// Simulates a call to the chaincode's `invoke`.
    pub fn simulate(&self, request: &TxRequest) -> Result<Proposal, LedgerError> {
        self.simulate_entry(request, Entry::Invoke)
    }

    /// Simulates and commits `init`. How chaincodes are instantiated.
    pub fn instantiate(&self, request: &TxRequest) -> Result<CommitReceipt, LedgerError> {
        let proposal = self.simulate_init(request)?;
        self.commit(proposal)
    }

    /// Simulates and commits `invoke`.
    pub fn submit(&self, request: &TxRequest) -> Result<CommitReceipt, LedgerError> {
        let proposal = self.simulate(request)?;
        self.commit(proposal)
    }

    /// Simulates `invoke` and discards its effects. Used for queries.
    pub fn evaluate(&self, request: &TxRequest) -> Result<Response, LedgerError> {
        Ok(self.simulate(request)?.response)
    }

    /// Validates and commits a proposal.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Endorsement`] if the chaincode responded with
    /// an error, and [`LedgerError::MvccReadConflict`] if any read is stale.
    /// In both cases no write of the transaction is applied.
    pub fn commit(&self, proposal: Proposal) -> Result<CommitReceipt, LedgerError> {
        if !proposal.response.is_ok() {
            tracing::warn!(
                tx_id = %proposal.simulation.tx_id,
                chaincode = %proposal.simulation.chaincode,
                status = proposal.response.status,
                message = %proposal.response.message,
                "proposal not endorsed"
            );
            return Err(LedgerError::Endorsement {
                tx_id: proposal.simulation.tx_id,
                status: proposal.response.status,
                message: proposal.response.message,
            });
        }
        let mut receipt = self.apply(proposal.simulation)?;
        receipt.payload = proposal.response.payload;
        Ok(receipt)
    }

    /// Validates and commits raw simulation effects.
    pub fn apply(&self, simulation: Simulation) -> Result<CommitReceipt, LedgerError> {
        let mut guard = self.state.write();

        if let Some(stale) = simulation.rwset.first_stale_read(&guard) {
            tracing::warn!(
                tx_id = %simulation.tx_id,
                key = %stale,
                simulated_at = simulation.snapshot_height,
                current = guard.height(),
                "mvcc read conflict, transaction rejected"
            );
            return Err(LedgerError::MvccReadConflict {
                tx_id: simulation.tx_id,
                key: stale.to_string(),
            });
        }

        let mut next = WorldState::clone(&guard);
        let block_number = next.apply_block(simulation.rwset.writes());
        *guard = Arc::new(next);
        drop(guard);

        tracing::info!(
            tx_id = %simulation.tx_id,
            chaincode = %simulation.chaincode,
            block = block_number,
            writes = simulation.rwset.writes().len(),
            events = simulation.events.len(),
            "transaction committed"
        );

        Ok(CommitReceipt {
            tx_id: simulation.tx_id,
            block_number,
            payload: Vec::new(),
            events: simulation.events,
        })
    }

    /// Runs `f` against a fresh simulation of `chaincode`'s namespace.
    ///
    /// Gives tests and tools direct stub access without deploying a
    /// chaincode for it. Commit the returned effects with [`apply`](Self::apply).
    pub fn execute<T>(
        &self,
        chaincode: &str,
        creator: Option<SerializedIdentity>,
        f: impl FnOnce(&mut dyn ChaincodeStub) -> T,
    ) -> (T, Simulation) {
        let snapshot = self.snapshot();
        let tx_id = new_tx_id(creator.as_ref());
        let mut sim = TxSimulation::new(
            &snapshot,
            &self.registry,
            &self.channel,
            chaincode,
            tx_id.clone(),
            Utc::now(),
            creator,
        );
        let out = f(&mut sim);
        let (rwset, events) = sim.finish();
        let simulation = Simulation {
            tx_id,
            chaincode: chaincode.to_string(),
            snapshot_height: snapshot.height(),
            rwset,
            events,
        };
        (out, simulation)
    }

    fn simulate_entry(&self, request: &TxRequest, entry: Entry) -> Result<Proposal, LedgerError> {
        let chaincode = self
            .registry
            .get(&request.chaincode)
            .ok_or_else(|| LedgerError::UnknownChaincode(request.chaincode.clone()))?;

        let snapshot = self.snapshot();
        let tx_id = new_tx_id(request.creator.as_ref());
        tracing::debug!(
            tx_id = %tx_id,
            chaincode = %request.chaincode,
            function = %request.function(),
            height = snapshot.height(),
            "simulating transaction"
        );

        let mut sim = TxSimulation::new(
            &snapshot,
            &self.registry,
            &self.channel,
            request.chaincode.as_str(),
            tx_id.clone(),
            request.timestamp.unwrap_or_else(Utc::now),
            request.creator.clone(),
        );
        let response = match entry {
            Entry::Init => chaincode.init(&mut sim, &request.args),
            Entry::Invoke => chaincode.invoke(&mut sim, &request.args),
        };
        let (rwset, events) = sim.finish();

        Ok(Proposal {
            simulation: Simulation {
                tx_id,
                chaincode: request.chaincode.clone(),
                snapshot_height: snapshot.height(),
                rwset,
                events,
            },
            response,
        })
    }
}

/// Transaction id: hex SHA-256 over a random nonce and the creator bytes.
fn new_tx_id(creator: Option<&SerializedIdentity>) -> String {
    let mut preimage = Uuid::new_v4().as_bytes().to_vec();
    if let Some(creator) = creator {
        preimage.extend_from_slice(&creator.to_bytes());
    }
    sha256_hex(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counter chaincode: `incr <key>` reads, adds one, writes back.
    struct Counter;

    impl Chaincode for Counter {
        fn init(&self, stub: &mut dyn ChaincodeStub, _args: &[Vec<u8>]) -> Response {
            match stub.put_state("n", b"0".to_vec()) {
                Ok(()) => Response::success(Vec::new()),
                Err(e) => Response::error(e.to_string()),
            }
        }

        fn invoke(&self, stub: &mut dyn ChaincodeStub, args: &[Vec<u8>]) -> Response {
            match args.first().map(Vec::as_slice) {
                Some(b"incr") => {
                    let current = stub
                        .get_state("n")
                        .ok()
                        .flatten()
                        .and_then(|v| String::from_utf8(v).ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(0);
                    let next = (current + 1).to_string();
                    if let Err(e) = stub.put_state("n", next.clone().into_bytes()) {
                        return Response::error(e.to_string());
                    }
                    let _ = stub.set_event("incremented", next.clone().into_bytes());
                    Response::success(next.into_bytes())
                }
                Some(b"get") => match stub.get_state("n") {
                    Ok(v) => Response::success(v.unwrap_or_default()),
                    Err(e) => Response::error(e.to_string()),
                },
                Some(b"fail") => {
                    let _ = stub.put_state("n", b"999".to_vec());
                    Response::error("refusing")
                }
                Some(b"relay") => stub.invoke_chaincode("counter", &[b"incr".to_vec()], "ch"),
                _ => Response::error("unknown function"),
            }
        }
    }

    fn ledger() -> MemoryLedger {
        let registry = ChaincodeRegistry::new()
            .register("counter", Counter)
            .register("relay", Counter);
        let ledger = MemoryLedger::new("ch", registry);
        ledger.instantiate(&TxRequest::new("counter", "init")).unwrap();
        ledger
    }

    fn read_counter(ledger: &MemoryLedger) -> String {
        ledger
            .evaluate(&TxRequest::new("counter", "get"))
            .unwrap()
            .payload_str()
    }

    #[test]
    fn submit_commits_writes_and_events() {
        let ledger = ledger();
        let receipt = ledger.submit(&TxRequest::new("counter", "incr")).unwrap();
        assert_eq!(receipt.payload, b"1");
        assert_eq!(receipt.events.len(), 1);
        assert_eq!(receipt.events[0].name, "incremented");
        assert_eq!(read_counter(&ledger), "1");
        assert_eq!(ledger.height(), 2);
    }

    #[test]
    fn evaluate_does_not_commit() {
        let ledger = ledger();
        let height = ledger.height();
        let response = ledger.evaluate(&TxRequest::new("counter", "incr")).unwrap();
        assert_eq!(response.payload, b"1");
        assert_eq!(read_counter(&ledger), "0");
        assert_eq!(ledger.height(), height);
    }

    #[test]
    fn error_response_is_never_committed() {
        let ledger = ledger();
        let root = ledger.state_root();
        let err = ledger.submit(&TxRequest::new("counter", "fail")).unwrap_err();
        assert!(matches!(err, LedgerError::Endorsement { .. }));
        assert_eq!(read_counter(&ledger), "0");
        assert_eq!(ledger.state_root(), root);
    }

    #[test]
    fn overlapping_transactions_conflict() {
        let ledger = ledger();
        let first = ledger.simulate(&TxRequest::new("counter", "incr")).unwrap();
        let second = ledger.simulate(&TxRequest::new("counter", "incr")).unwrap();

        ledger.commit(first).unwrap();
        let err = ledger.commit(second).unwrap_err();
        assert!(matches!(err, LedgerError::MvccReadConflict { .. }));
        assert_eq!(read_counter(&ledger), "1");
    }

    #[test]
    fn cross_chaincode_writes_land_in_callee_namespace() {
        let ledger = ledger();
        ledger.submit(&TxRequest::new("relay", "relay")).unwrap();
        assert_eq!(read_counter(&ledger), "1");

        let snapshot = ledger.snapshot();
        let relay_keys: Vec<&str> = snapshot.public_entries("relay").map(|(k, _)| k).collect();
        assert!(relay_keys.is_empty());
    }

    #[test]
    fn unknown_chaincode_rejected() {
        let ledger = ledger();
        let err = ledger.submit(&TxRequest::new("nope", "x")).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownChaincode(_)));
    }

    #[test]
    fn private_data_is_member_only_but_hash_is_public() {
        let ledger = ledger();
        let owner = SerializedIdentity::enroll("OrgAMSP", "alice", "OrgA", "a.example.com");
        let other = SerializedIdentity::enroll("OrgBMSP", "bob", "OrgB", "b.example.com");

        let (res, sim) = ledger.execute("counter", Some(owner.clone()), |stub| {
            stub.put_private_data("_implicit_org_OrgAMSP", "k", b"secret".to_vec())
        });
        res.unwrap();
        ledger.apply(sim).unwrap();

        let (hash, _) = ledger.execute("counter", Some(other.clone()), |stub| {
            stub.get_private_data_hash("_implicit_org_OrgAMSP", "k")
        });
        assert_eq!(hash.unwrap(), Some(crate::crypto::sha256(b"secret")));

        let (denied, _) = ledger.execute("counter", Some(other), |stub| {
            stub.get_private_data("_implicit_org_OrgAMSP", "k")
        });
        assert!(matches!(denied, Err(crate::chaincode::StateError::AccessDenied { .. })));

        let (allowed, _) = ledger.execute("counter", Some(owner), |stub| {
            stub.get_private_data("_implicit_org_OrgAMSP", "k")
        });
        assert_eq!(allowed.unwrap(), Some(b"secret".to_vec()));
    }

    #[test]
    fn reads_do_not_observe_own_writes() {
        let ledger = ledger();
        let (seen, _) = ledger.execute("counter", None, |stub| {
            stub.put_state("n", b"41".to_vec()).unwrap();
            stub.get_state("n").unwrap()
        });
        assert_eq!(seen, Some(b"0".to_vec()));
    }

    #[test]
    fn tx_ids_are_unique_hex() {
        let a = new_tx_id(None);
        let b = new_tx_id(None);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
