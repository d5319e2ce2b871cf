//! # Commitment Vault
//!
//! Content records stored in each organization's implicit private
//! collection (`_implicit_org_<MSP>`). Only the owning organization can read
//! a record back; every organization on the channel can read its SHA-256
//! hash, which is what a later disclosure is checked against.
//!
//! A record is the JSON `{id, owner, desc}`. Its id is the id of the
//! transaction that uploaded it, so ids never collide across uploads, and
//! the exact record bytes echoed by `upload` are what a seller hands to a
//! buyer for disclosure.

use datamarket_protocol::chaincode::{ChaincodeStub, StateError};
use datamarket_protocol::config::implicit_collection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{state_error_kind, Classify, ErrorKind};
use crate::events::{ContractEvent, EventError, UploadEvent};
use crate::identity::{resolve_caller, IdentityError};

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("{0} can not be empty")]
    EmptyField(&'static str),

    /// A record with this id already exists in the partition.
    #[error("content {id} already exists in {collection}")]
    AlreadyExists { collection: String, id: String },

    #[error("content {id} not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error("failed to encode content record: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl Classify for VaultError {
    fn kind(&self) -> ErrorKind {
        match self {
            VaultError::EmptyField(_) | VaultError::AlreadyExists { .. } => ErrorKind::Validation,
            VaultError::NotFound { .. } => ErrorKind::NotFound,
            VaultError::Encoding(_) => ErrorKind::Dependency,
            VaultError::Identity(e) => e.kind(),
            VaultError::Event(e) => e.kind(),
            VaultError::State(e) => state_error_kind(e),
        }
    }
}

/// A stored content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Content id: the uploading transaction's id.
    pub id: String,
    /// Declared owner of the content.
    pub owner: String,
    /// Content descriptor.
    pub desc: String,
}

impl Commitment {
    pub fn to_bytes(&self) -> Result<Vec<u8>, VaultError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Stores a new record in the caller's partition and emits an upload event.
///
/// `owner` defaults to the caller's MSP id. Returns the record together with
/// the exact bytes that were stored.
pub fn upload(
    stub: &mut dyn ChaincodeStub,
    owner: Option<&str>,
    description: &str,
) -> Result<(Commitment, Vec<u8>), VaultError> {
    if description.is_empty() {
        return Err(VaultError::EmptyField("description"));
    }
    let caller = resolve_caller(stub)?;
    let collection = implicit_collection(&caller.msp_id);
    let id = stub.tx_id().to_string();

    if stub.get_private_data_hash(&collection, &id)?.is_some() {
        return Err(VaultError::AlreadyExists { collection, id });
    }

    let commitment = Commitment {
        owner: owner.unwrap_or(caller.msp_id.as_str()).to_string(),
        desc: description.to_string(),
        id,
    };
    if commitment.owner.is_empty() {
        return Err(VaultError::EmptyField("owner"));
    }
    let bytes = commitment.to_bytes()?;
    stub.put_private_data(&collection, &commitment.id, bytes.clone())?;

    ContractEvent::from(UploadEvent {
        id: commitment.id.clone(),
        owner: commitment.owner.clone(),
        upload_time: stub.tx_timestamp().timestamp(),
    })
    .emit(stub)?;

    tracing::info!(
        id = %commitment.id,
        owner = %commitment.owner,
        collection = %collection,
        "content uploaded"
    );
    Ok((commitment, bytes))
}

/// Hash of the content stored under `content_id` in `owner_org`'s partition.
/// Readable by any organization.
pub fn commit_hash(
    stub: &mut dyn ChaincodeStub,
    owner_org: &str,
    content_id: &str,
) -> Result<[u8; 32], VaultError> {
    check_ref(owner_org, content_id)?;
    let collection = implicit_collection(owner_org);
    stub.get_private_data_hash(&collection, content_id)?
        .ok_or_else(|| VaultError::NotFound {
            collection,
            id: content_id.to_string(),
        })
}

/// The stored content itself. Only `owner_org` may read it.
pub fn retrieve(
    stub: &mut dyn ChaincodeStub,
    owner_org: &str,
    content_id: &str,
) -> Result<Vec<u8>, VaultError> {
    check_ref(owner_org, content_id)?;
    let collection = implicit_collection(owner_org);
    let content = stub.get_private_data(&collection, content_id)?;
    tracing::debug!(id = content_id, collection = %collection, found = content.is_some(), "content read");
    content.ok_or_else(|| VaultError::NotFound {
        collection,
        id: content_id.to_string(),
    })
}

/// Writes disclosed content into `recipient_org`'s partition.
pub fn store_disclosed(
    stub: &mut dyn ChaincodeStub,
    recipient_org: &str,
    content_id: &str,
    content: &[u8],
) -> Result<(), VaultError> {
    check_ref(recipient_org, content_id)?;
    let collection = implicit_collection(recipient_org);
    stub.put_private_data(&collection, content_id, content.to_vec())?;
    Ok(())
}

fn check_ref(org: &str, content_id: &str) -> Result<(), VaultError> {
    if org.is_empty() {
        return Err(VaultError::EmptyField("organization"));
    }
    if content_id.is_empty() {
        return Err(VaultError::EmptyField("content id"));
    }
    Ok(())
}
