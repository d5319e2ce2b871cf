//! # Identity Resolver
//!
//! Turns the creator credential of the current transaction into the
//! attributes the contracts authorize against. A missing or undecodable
//! credential is an authorization failure, never an anonymous caller.

use datamarket_protocol::chaincode::ChaincodeStub;
use datamarket_protocol::identity::CertificateError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// Errors raised while resolving the caller.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The transaction carries no creator.
    #[error("no caller credential on transaction")]
    MissingCredential,

    /// The creator has an empty MSP id.
    #[error("caller credential has no MSP id")]
    MissingMspId,

    /// The certificate inside the creator could not be decoded.
    #[error("invalid caller certificate: {0}")]
    Certificate(#[from] CertificateError),
}

impl Classify for IdentityError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Authorization
    }
}

/// Verified attributes of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    /// MSP id of the caller's organization. Names its private partition.
    pub msp_id: String,
    /// Subject organization (first O attribute), if present.
    pub organization: Option<String>,
    /// Subject common name.
    pub common_name: String,
    /// Organization of the certificate authority that enrolled the caller.
    pub issuer_organization: Option<String>,
}

/// Resolves the creator of the transaction running on `stub`.
pub fn resolve_caller(stub: &dyn ChaincodeStub) -> Result<CallerIdentity, IdentityError> {
    let creator = stub.creator().ok_or(IdentityError::MissingCredential)?;
    if creator.msp_id.is_empty() {
        return Err(IdentityError::MissingMspId);
    }
    let cert = creator.certificate()?;
    Ok(CallerIdentity {
        msp_id: creator.msp_id.clone(),
        organization: cert.subject.primary_organization().map(str::to_string),
        common_name: cert.subject.common_name,
        issuer_organization: cert.issuer.primary_organization().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamarket_protocol::identity::SerializedIdentity;
    use datamarket_protocol::storage::{ChaincodeRegistry, MemoryLedger};

    fn resolve(creator: Option<SerializedIdentity>) -> Result<CallerIdentity, IdentityError> {
        let ledger = MemoryLedger::new("ch", ChaincodeRegistry::new());
        ledger.execute("erc20", creator, |stub| resolve_caller(stub)).0
    }

    #[test]
    fn resolves_enrolled_identity() {
        let id = SerializedIdentity::enroll("IntageMSP", "Intage", "Intage", "intage.example.com");
        let caller = resolve(Some(id)).unwrap();
        assert_eq!(caller.msp_id, "IntageMSP");
        assert_eq!(caller.common_name, "Intage");
        assert_eq!(caller.organization.as_deref(), Some("Intage"));
        assert_eq!(caller.issuer_organization.as_deref(), Some("intage.example.com"));
    }

    #[test]
    fn missing_credential_is_authorization_error() {
        let err = resolve(None).unwrap_err();
        assert!(matches!(err, IdentityError::MissingCredential));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn malformed_certificate_is_rejected() {
        let id = SerializedIdentity::new("IntageMSP", b"not a cert".to_vec());
        let err = resolve(Some(id)).unwrap_err();
        assert!(matches!(err, IdentityError::Certificate(_)));
    }

    #[test]
    fn empty_msp_id_is_rejected() {
        let id = SerializedIdentity::enroll("", "Intage", "Intage", "intage.example.com");
        assert!(matches!(resolve(Some(id)), Err(IdentityError::MissingMspId)));
    }
}
