//! # Error Taxonomy
//!
//! Every contract error maps onto one [`ErrorKind`], and every kind onto
//! one shim status code. Clients can branch on the status without parsing
//! messages; humans get the message.
//!
//! | Kind | Status | Typical cause |
//! |---|---|---|
//! | Validation | 400 | wrong argument count, empty field, bad integer |
//! | InsufficientFunds | 402 | transfer larger than the sender's balance |
//! | Authorization | 403 | mint by a non-issuer, missing credentials |
//! | NotFound | 404 | unknown commitment, uninitialized token |
//! | Integrity | 409 | disclosed content does not match its hash |
//! | Dependency | 502 | settlement call failed, store error |

use datamarket_protocol::chaincode::{Response, StateError};
use std::fmt;
use thiserror::Error;

/// Category of a contract failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Integrity,
    Authorization,
    NotFound,
    InsufficientFunds,
    Dependency,
}

impl ErrorKind {
    /// Shim status code reported for this kind.
    pub fn status(self) -> i32 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::InsufficientFunds => 402,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Integrity => 409,
            ErrorKind::Dependency => 502,
        }
    }

    /// Inverse of [`status`](Self::status), for clients reading responses.
    pub fn from_status(status: i32) -> Option<Self> {
        match status {
            400 => Some(ErrorKind::Validation),
            402 => Some(ErrorKind::InsufficientFunds),
            403 => Some(ErrorKind::Authorization),
            404 => Some(ErrorKind::NotFound),
            409 => Some(ErrorKind::Integrity),
            502 => Some(ErrorKind::Dependency),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not-found",
            ErrorKind::InsufficientFunds => "insufficient-funds",
            ErrorKind::Dependency => "dependency-failure",
        };
        f.write_str(s)
    }
}

/// An error that knows its own category.
pub trait Classify: std::error::Error {
    fn kind(&self) -> ErrorKind;

    /// Converts the error into a shim response whose message names the
    /// operation that failed.
    fn to_response(&self, operation: &str) -> Response {
        Response::error_with_status(self.kind().status(), format!("{operation}: {self}"))
    }
}

/// Kind of a stub failure: access denials are authorization errors,
/// everything else is the store failing underneath us.
pub(crate) fn state_error_kind(err: &StateError) -> ErrorKind {
    match err {
        StateError::AccessDenied { .. } => ErrorKind::Authorization,
        StateError::EmptyKey | StateError::EmptyCollection => ErrorKind::Validation,
        StateError::Unavailable(_) => ErrorKind::Dependency,
    }
}

// ---------------------------------------------------------------------------
// Invocation errors
// ---------------------------------------------------------------------------

/// Errors raised while turning raw arguments into a typed invocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvocationError {
    /// No function name was supplied.
    #[error("missing function name")]
    MissingFunction,

    /// The function name is not one this chaincode serves.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of parameters.
    #[error("incorrect number of params for {function}: expected {expected}, got {got}")]
    ParamCount {
        function: String,
        expected: String,
        got: usize,
    },

    /// A required parameter was empty.
    #[error("{param} can not be empty")]
    EmptyParam { param: &'static str },

    /// A parameter was not valid UTF-8.
    #[error("param {index} is not valid UTF-8")]
    NonUtf8 { index: usize },

    /// An amount was not an integer at all.
    #[error("{param} is not an integer: {value:?}")]
    InvalidInteger { param: &'static str, value: String },

    /// An amount was a negative integer.
    #[error("{param} must not be negative: {value}")]
    NegativeAmount { param: &'static str, value: String },
}

impl Classify for InvocationError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
