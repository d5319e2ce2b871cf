//! # Identity Module
//!
//! Credential material as the ledger hands it to a contract. Every
//! invocation carries the creator's serialized identity: the MSP id of the
//! organization that vouches for it, plus the certificate the MSP issued.
//!
//! The contracts never verify certificates themselves. By the time a
//! transaction reaches a chaincode, the runtime has already checked the
//! signature chain; what is left for the contract is reading attributes
//! (common name, organization, issuing CA organization) out of it.

pub mod certificate;

pub use certificate::{Certificate, CertificateError, DistinguishedName, SerializedIdentity};
