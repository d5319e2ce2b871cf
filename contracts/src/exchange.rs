//! # Exchange Orchestrator
//!
//! Verified disclosure with fee settlement, in one transaction.
//!
//! ```text
//! compare_and_disclose(owner_org, id, claimed, buyer, seller)
//!   1. stored = vault hash of (owner_org, id)        ── not found?  abort
//!   2. SHA-256(claimed) == stored                     ── mismatch?   abort
//!   3. write claimed into the caller's partition
//!   4. emit shareEvent { from: seller, to: buyer, id }
//!   5. settlement.transfer(buyer → seller, fee)       ── failed?     error
//! ```
//!
//! Steps 1 and 2 only read, so a failed check leaves nothing behind. Step 5
//! runs inside the same transaction as steps 3 and 4: when it fails, the
//! error response makes the ledger discard the disclosure write together
//! with everything else.
//!
//! Settlement goes through [`SettlementPort`]. In a chaincode it is
//! [`ChaincodeSettlement`], a cross-chaincode call into the token ledger;
//! tests can substitute their own.

use datamarket_protocol::chaincode::ChaincodeStub;
use datamarket_protocol::config::{DISCLOSURE_FEE, TOKEN_CHAINCODE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitment_vault::{self, VaultError};
use crate::error::{Classify, ErrorKind};
use crate::events::{ContractEvent, EventError, ShareEvent};
use crate::identity::{resolve_caller, IdentityError};

// ---------------------------------------------------------------------------
// Settlement port
// ---------------------------------------------------------------------------

/// Failure of the settlement call.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The token ledger refused the transfer.
    #[error("{chaincode} transfer rejected (status {status}): {message}")]
    Rejected {
        chaincode: String,
        status: i32,
        message: String,
    },
}

impl Classify for SettlementError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Dependency
    }
}

/// Moves tokens as part of the running transaction.
pub trait SettlementPort: Send + Sync {
    fn transfer(
        &self,
        stub: &mut dyn ChaincodeStub,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), SettlementError>;
}

/// Settles by invoking the token chaincode's `transfer`.
#[derive(Debug, Clone)]
pub struct ChaincodeSettlement {
    chaincode: String,
    /// Channel of the token chaincode. `None` means the caller's channel.
    channel: Option<String>,
}

impl ChaincodeSettlement {
    pub fn new(chaincode: impl Into<String>) -> Self {
        Self {
            chaincode: chaincode.into(),
            channel: None,
        }
    }

    pub fn on_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

impl Default for ChaincodeSettlement {
    fn default() -> Self {
        Self::new(TOKEN_CHAINCODE)
    }
}

impl SettlementPort for ChaincodeSettlement {
    fn transfer(
        &self,
        stub: &mut dyn ChaincodeStub,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), SettlementError> {
        let args = vec![
            b"transfer".to_vec(),
            from.as_bytes().to_vec(),
            to.as_bytes().to_vec(),
            amount.to_string().into_bytes(),
        ];
        let channel = match &self.channel {
            Some(c) => c.clone(),
            None => stub.channel_id().to_string(),
        };
        let response = stub.invoke_chaincode(&self.chaincode, &args, &channel);
        if response.is_ok() {
            Ok(())
        } else {
            Err(SettlementError::Rejected {
                chaincode: self.chaincode.clone(),
                status: response.status,
                message: response.message,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("{0} can not be empty")]
    EmptyField(&'static str),

    /// The claimed content does not hash to the stored commitment.
    #[error("data does not match with hash of {content_id}: stored {stored}, claimed {claimed}")]
    IntegrityMismatch {
        content_id: String,
        stored: String,
        claimed: String,
    },

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("fee settlement failed: {0}")]
    Settlement(#[from] SettlementError),
}

impl Classify for ExchangeError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::EmptyField(_) => ErrorKind::Validation,
            ExchangeError::IntegrityMismatch { .. } => ErrorKind::Integrity,
            ExchangeError::Vault(e) => e.kind(),
            ExchangeError::Identity(e) => e.kind(),
            ExchangeError::Event(e) => e.kind(),
            ExchangeError::Settlement(e) => e.kind(),
        }
    }
}

/// A buyer's claim to content committed by `owner_org`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureRequest {
    /// MSP id of the organization holding the commitment.
    pub owner_org: String,
    pub content_id: String,
    /// The content being disclosed. Must hash to the commitment.
    pub claimed_content: Vec<u8>,
    /// Account that pays the fee.
    pub buyer: String,
    /// Account that receives the fee.
    pub seller: String,
}

/// Result of a settled disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disclosure {
    pub content_id: String,
    /// MSP id whose partition received the content.
    pub recipient_org: String,
    pub buyer: String,
    pub seller: String,
    pub fee: u64,
}

/// Couples disclosure and payment.
#[derive(Debug, Clone)]
pub struct ExchangeOrchestrator<S> {
    settlement: S,
    fee: u64,
}

impl<S: SettlementPort> ExchangeOrchestrator<S> {
    /// An orchestrator charging the standard disclosure fee.
    pub fn new(settlement: S) -> Self {
        Self {
            settlement,
            fee: DISCLOSURE_FEE,
        }
    }

    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    /// Verifies `request` against the stored commitment, discloses the
    /// content to the caller, and settles the fee.
    pub fn compare_and_disclose(
        &self,
        stub: &mut dyn ChaincodeStub,
        request: &DisclosureRequest,
    ) -> Result<Disclosure, ExchangeError> {
        for (field, value) in [
            ("owner organization", request.owner_org.as_str()),
            ("content id", request.content_id.as_str()),
            ("buyer", request.buyer.as_str()),
            ("seller", request.seller.as_str()),
        ] {
            if value.is_empty() {
                return Err(ExchangeError::EmptyField(field));
            }
        }

        let stored = commitment_vault::commit_hash(stub, &request.owner_org, &request.content_id)?;
        let claimed = datamarket_protocol::crypto::sha256(&request.claimed_content);
        if stored != claimed {
            tracing::warn!(
                content_id = %request.content_id,
                owner_org = %request.owner_org,
                "disclosure rejected: content does not match commitment"
            );
            return Err(ExchangeError::IntegrityMismatch {
                content_id: request.content_id.clone(),
                stored: hex::encode(stored),
                claimed: hex::encode(claimed),
            });
        }

        let caller = resolve_caller(stub)?;
        commitment_vault::store_disclosed(
            stub,
            &caller.msp_id,
            &request.content_id,
            &request.claimed_content,
        )?;

        ContractEvent::from(ShareEvent {
            from: request.seller.clone(),
            to: request.buyer.clone(),
            id: request.content_id.clone(),
        })
        .emit(stub)?;

        self.settlement
            .transfer(stub, &request.buyer, &request.seller, self.fee)?;

        tracing::info!(
            tx_id = stub.tx_id(),
            content_id = %request.content_id,
            recipient_org = %caller.msp_id,
            buyer = %request.buyer,
            seller = %request.seller,
            fee = self.fee,
            "content disclosed and fee settled"
        );
        Ok(Disclosure {
            content_id: request.content_id.clone(),
            recipient_org: caller.msp_id,
            buyer: request.buyer.clone(),
            seller: request.seller.clone(),
            fee: self.fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamarket_protocol::config::implicit_collection;
    use datamarket_protocol::identity::SerializedIdentity;
    use datamarket_protocol::storage::{ChaincodeRegistry, MemoryLedger, StateKey};
    use parking_lot::Mutex;

    /// Records transfers instead of moving tokens.
    #[derive(Default)]
    struct RecordingSettlement {
        transfers: Mutex<Vec<(String, String, u64)>>,
        fail: bool,
    }

    impl SettlementPort for RecordingSettlement {
        fn transfer(
            &self,
            _stub: &mut dyn ChaincodeStub,
            from: &str,
            to: &str,
            amount: u64,
        ) -> Result<(), SettlementError> {
            if self.fail {
                return Err(SettlementError::Rejected {
                    chaincode: "fake".into(),
                    status: 402,
                    message: "insufficient balance".into(),
                });
            }
            self.transfers.lock().push((from.into(), to.into(), amount));
            Ok(())
        }
    }

    fn intage() -> SerializedIdentity {
        SerializedIdentity::enroll("IntageMSP", "Intage", "Intage", "intage.example.com")
    }

    fn ws1() -> SerializedIdentity {
        SerializedIdentity::enroll("WS1MSP", "WS1", "WS1", "ws1.example.com")
    }

    /// A ledger holding one commitment by Intage; returns its id and bytes.
    fn with_commitment() -> (MemoryLedger, String, Vec<u8>) {
        let ledger = MemoryLedger::new("ch", ChaincodeRegistry::new());
        let (res, sim) = ledger.execute("privateData", Some(intage()), |stub| {
            commitment_vault::upload(stub, None, "panel survey")
        });
        let (commitment, bytes) = res.unwrap();
        ledger.apply(sim).unwrap();
        (ledger, commitment.id, bytes)
    }

    fn request(id: &str, content: &[u8]) -> DisclosureRequest {
        DisclosureRequest {
            owner_org: "IntageMSP".into(),
            content_id: id.into(),
            claimed_content: content.to_vec(),
            buyer: "WS1".into(),
            seller: "Intage".into(),
        }
    }

    #[test]
    fn matching_content_is_disclosed_and_settled() {
        let (ledger, id, bytes) = with_commitment();
        let orchestrator = ExchangeOrchestrator::new(RecordingSettlement::default());

        let (res, sim) = ledger.execute("privateData", Some(ws1()), |stub| {
            orchestrator.compare_and_disclose(stub, &request(&id, &bytes))
        });
        let disclosure = res.unwrap();
        assert_eq!(disclosure.recipient_org, "WS1MSP");
        assert_eq!(disclosure.fee, 1);

        let key = StateKey::private("privateData", implicit_collection("WS1MSP"), id.clone());
        assert_eq!(sim.rwset.writes().get(&key), Some(&bytes));
        assert_eq!(sim.events.len(), 1);
        assert_eq!(
            ContractEvent::decode(&sim.events[0].name, &sim.events[0].payload).unwrap(),
            ContractEvent::Share(ShareEvent {
                from: "Intage".into(),
                to: "WS1".into(),
                id,
            })
        );
        assert_eq!(
            *orchestrator.settlement().transfers.lock(),
            vec![("WS1".to_string(), "Intage".to_string(), 1)]
        );
    }

    #[test]
    fn mismatched_content_writes_nothing_and_pays_nothing() {
        let (ledger, id, _) = with_commitment();
        let orchestrator = ExchangeOrchestrator::new(RecordingSettlement::default());

        let (res, sim) = ledger.execute("privateData", Some(ws1()), |stub| {
            orchestrator.compare_and_disclose(stub, &request(&id, b"forged"))
        });
        let err = res.unwrap_err();
        assert!(matches!(err, ExchangeError::IntegrityMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(sim.rwset.is_read_only());
        assert!(sim.events.is_empty());
        assert!(orchestrator.settlement().transfers.lock().is_empty());
    }

    #[test]
    fn unknown_commitment_is_not_found() {
        let (ledger, _, bytes) = with_commitment();
        let orchestrator = ExchangeOrchestrator::new(RecordingSettlement::default());
        let (res, _) = ledger.execute("privateData", Some(ws1()), |stub| {
            orchestrator.compare_and_disclose(stub, &request("missing", &bytes))
        });
        assert_eq!(res.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn failed_settlement_fails_the_exchange() {
        let (ledger, id, bytes) = with_commitment();
        let orchestrator = ExchangeOrchestrator::new(RecordingSettlement {
            fail: true,
            ..Default::default()
        });
        let (res, _) = ledger.execute("privateData", Some(ws1()), |stub| {
            orchestrator.compare_and_disclose(stub, &request(&id, &bytes))
        });
        let err = res.unwrap_err();
        assert!(matches!(err, ExchangeError::Settlement(_)));
        assert_eq!(err.kind(), ErrorKind::Dependency);
    }

    #[test]
    fn custom_fee_is_charged() {
        let (ledger, id, bytes) = with_commitment();
        let orchestrator = ExchangeOrchestrator::new(RecordingSettlement::default()).with_fee(5);
        let (res, _) = ledger.execute("privateData", Some(ws1()), |stub| {
            orchestrator.compare_and_disclose(stub, &request(&id, &bytes))
        });
        assert_eq!(res.unwrap().fee, 5);
        assert_eq!(orchestrator.settlement().transfers.lock()[0].2, 5);
    }

    #[test]
    fn empty_buyer_rejected_before_any_read() {
        let (ledger, id, bytes) = with_commitment();
        let orchestrator = ExchangeOrchestrator::new(RecordingSettlement::default());
        let mut req = request(&id, &bytes);
        req.buyer.clear();
        let (res, sim) = ledger.execute("privateData", Some(ws1()), |stub| {
            orchestrator.compare_and_disclose(stub, &req)
        });
        assert!(matches!(res, Err(ExchangeError::EmptyField("buyer"))));
        assert!(sim.rwset.reads().is_empty());
    }
}
