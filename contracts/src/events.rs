//! # Contract Events
//!
//! Every event a DataMarket chaincode emits, as one closed set. Each kind
//! has a fixed field set and a fixed wire name, and all of them go through
//! the same JSON encoding step. Listeners decode with
//! [`ContractEvent::decode`] using the event name the ledger delivers.

use datamarket_protocol::chaincode::{ChaincodeStub, StateError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{state_error_kind, Classify, ErrorKind};

pub const UPLOAD_EVENT: &str = "uploadEvent";
pub const TRANSFER_EVENT: &str = "transferEvent";
pub const SHARE_EVENT: &str = "shareEvent";

/// Errors raised while encoding, decoding, or emitting events.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("event encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("failed to emit event: {0}")]
    State(#[from] StateError),
}

impl Classify for EventError {
    fn kind(&self) -> ErrorKind {
        match self {
            EventError::UnknownEvent(_) => ErrorKind::Validation,
            EventError::Encoding(_) => ErrorKind::Dependency,
            EventError::State(e) => state_error_kind(e),
        }
    }
}

/// A commitment was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    pub id: String,
    pub owner: String,
    /// Transaction timestamp, Unix seconds.
    pub upload_time: i64,
}

/// Tokens moved between accounts, or were minted when `sender` is `0x0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

/// Content was disclosed to a buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEvent {
    pub from: String,
    pub to: String,
    pub id: String,
}

/// Any event emitted by the DataMarket chaincodes.
///
/// The serde form (`{"event": "<wire name>", "payload": {..}}`) is for
/// forwarding to off-ledger subscribers; on the ledger only the payload
/// travels, see [`encode`](Self::encode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ContractEvent {
    #[serde(rename = "uploadEvent")]
    Upload(UploadEvent),
    #[serde(rename = "transferEvent")]
    Transfer(TransferEvent),
    #[serde(rename = "shareEvent")]
    Share(ShareEvent),
}

impl ContractEvent {
    /// Wire name the event is emitted under.
    pub fn name(&self) -> &'static str {
        match self {
            ContractEvent::Upload(_) => UPLOAD_EVENT,
            ContractEvent::Transfer(_) => TRANSFER_EVENT,
            ContractEvent::Share(_) => SHARE_EVENT,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EventError> {
        let bytes = match self {
            ContractEvent::Upload(e) => serde_json::to_vec(e)?,
            ContractEvent::Transfer(e) => serde_json::to_vec(e)?,
            ContractEvent::Share(e) => serde_json::to_vec(e)?,
        };
        Ok(bytes)
    }

    /// Decodes an event delivered under `name`.
    pub fn decode(name: &str, payload: &[u8]) -> Result<Self, EventError> {
        match name {
            UPLOAD_EVENT => Ok(ContractEvent::Upload(serde_json::from_slice(payload)?)),
            TRANSFER_EVENT => Ok(ContractEvent::Transfer(serde_json::from_slice(payload)?)),
            SHARE_EVENT => Ok(ContractEvent::Share(serde_json::from_slice(payload)?)),
            other => Err(EventError::UnknownEvent(other.to_string())),
        }
    }

    /// Encodes the event and hands it to the stub.
    pub fn emit(&self, stub: &mut dyn ChaincodeStub) -> Result<(), EventError> {
        let payload = self.encode()?;
        stub.set_event(self.name(), payload)?;
        tracing::debug!(tx_id = stub.tx_id(), event = self.name(), "event emitted");
        Ok(())
    }
}

impl From<UploadEvent> for ContractEvent {
    fn from(e: UploadEvent) -> Self {
        ContractEvent::Upload(e)
    }
}

impl From<TransferEvent> for ContractEvent {
    fn from(e: TransferEvent) -> Self {
        ContractEvent::Transfer(e)
    }
}

impl From<ShareEvent> for ContractEvent {
    fn from(e: ShareEvent) -> Self {
        ContractEvent::Share(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_event_uses_camel_case_fields() {
        let event = ContractEvent::from(UploadEvent {
            id: "tx1".into(),
            owner: "IntageMSP".into(),
            upload_time: 1_700_000_000,
        });
        let json: serde_json::Value = serde_json::from_slice(&event.encode().unwrap()).unwrap();
        assert_eq!(json["uploadTime"], 1_700_000_000);
        assert_eq!(json["owner"], "IntageMSP");
        assert_eq!(event.name(), "uploadEvent");
    }

    #[test]
    fn transfer_event_decodes_by_name() {
        let payload = br#"{"sender":"0x0","recipient":"X","amount":50}"#;
        let event = ContractEvent::decode(TRANSFER_EVENT, payload).unwrap();
        assert_eq!(
            event,
            ContractEvent::Transfer(TransferEvent {
                sender: "0x0".into(),
                recipient: "X".into(),
                amount: 50,
            })
        );
    }

    #[test]
    fn unknown_event_name_rejected() {
        let err = ContractEvent::decode("approvalEvent", b"{}").unwrap_err();
        assert!(matches!(err, EventError::UnknownEvent(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn malformed_payload_rejected() {
        let err = ContractEvent::decode(SHARE_EVENT, b"{\"from\":1}").unwrap_err();
        assert!(matches!(err, EventError::Encoding(_)));
    }

    #[test]
    fn tagged_form_names_the_event() {
        let event = ContractEvent::from(ShareEvent {
            from: "IntageMSP".into(),
            to: "WS1MSP".into(),
            id: "tx9".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "shareEvent");
        assert_eq!(json["payload"]["to"], "WS1MSP");
        assert_eq!(serde_json::from_value::<ContractEvent>(json).unwrap(), event);
    }
}
