//! # Certificates & Serialized Identities
//!
//! A `SerializedIdentity` is the creator field of a transaction:
//!
//! ```text
//! SerializedIdentity {
//!     msp_id:   "IntageMSP",
//!     id_bytes: JSON(Certificate { subject, issuer }),
//! }
//! ```
//!
//! The certificate is reduced to the two distinguished names the contracts
//! actually look at. The issuer name is the certificate authority's, so
//! `issuer.organization` identifies which CA enrolled the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while decoding credential material.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The identity carries no certificate bytes at all.
    #[error("identity has no certificate bytes")]
    Empty,

    /// The certificate bytes could not be decoded.
    #[error("malformed certificate: {0}")]
    Malformed(String),

    /// The certificate decoded but its subject has no common name.
    #[error("certificate subject has no common name")]
    MissingCommonName,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The subset of an X.509 distinguished name used for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinguishedName {
    /// CN attribute.
    pub common_name: String,
    /// O attributes, in certificate order.
    #[serde(default)]
    pub organization: Vec<String>,
}

impl DistinguishedName {
    /// Creates a name with a single organization attribute.
    pub fn new(common_name: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            organization: vec![organization.into()],
        }
    }

    /// The first O attribute, which is the one authorization decisions use.
    pub fn primary_organization(&self) -> Option<&str> {
        self.organization.first().map(String::as_str)
    }
}

/// An enrollment certificate: who the holder is, and who vouched for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// The enrolled identity.
    pub subject: DistinguishedName,
    /// The certificate authority that issued it.
    pub issuer: DistinguishedName,
}

impl Certificate {
    pub fn new(subject: DistinguishedName, issuer: DistinguishedName) -> Self {
        Self { subject, issuer }
    }

    /// Encodes the certificate as it travels inside a serialized identity.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decodes certificate bytes, rejecting empty input and empty subjects.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertificateError> {
        if bytes.is_empty() {
            return Err(CertificateError::Empty);
        }
        let cert: Certificate = serde_json::from_slice(bytes)
            .map_err(|e| CertificateError::Malformed(e.to_string()))?;
        if cert.subject.common_name.is_empty() {
            return Err(CertificateError::MissingCommonName);
        }
        Ok(cert)
    }
}

/// The creator of a transaction: MSP id plus certificate bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedIdentity {
    /// Membership service provider that vouches for this identity.
    pub msp_id: String,
    /// Encoded [`Certificate`].
    pub id_bytes: Vec<u8>,
}

impl SerializedIdentity {
    /// Wraps an already-encoded certificate.
    pub fn new(msp_id: impl Into<String>, id_bytes: Vec<u8>) -> Self {
        Self {
            msp_id: msp_id.into(),
            id_bytes,
        }
    }

    /// Issues an identity the way an organization's CA would enroll a user.
    ///
    /// * `msp_id` - MSP id of the member organization, e.g. `IntageMSP`.
    /// * `common_name` - Subject CN, e.g. `Intage`.
    /// * `organization` - Subject organization.
    /// * `ca_organization` - Organization of the issuing CA, e.g. `intage.example.com`.
    pub fn enroll(
        msp_id: impl Into<String>,
        common_name: impl Into<String>,
        organization: impl Into<String>,
        ca_organization: impl Into<String>,
    ) -> Self {
        let ca_organization = ca_organization.into();
        let cert = Certificate::new(
            DistinguishedName::new(common_name, organization),
            DistinguishedName::new(format!("ca.{ca_organization}"), ca_organization),
        );
        Self::new(msp_id, cert.to_bytes())
    }

    /// Decodes the embedded certificate.
    pub fn certificate(&self) -> Result<Certificate, CertificateError> {
        Certificate::from_bytes(&self.id_bytes)
    }

    /// Creator bytes as mixed into the transaction id.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.msp_id.len() + self.id_bytes.len());
        out.extend_from_slice(self.msp_id.as_bytes());
        out.extend_from_slice(&self.id_bytes);
        out
    }
}
