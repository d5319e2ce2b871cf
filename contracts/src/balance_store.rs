//! # Balance Store
//!
//! Account balances as decimal strings in the token chaincode's public
//! namespace, keyed by account identifier. An account that was never
//! credited reads as zero. Token metadata shares the namespace, so the
//! metadata keys are not valid account names.

use datamarket_protocol::chaincode::{ChaincodeStub, StateError};
use datamarket_protocol::config::{
    PUBLISHER_KEY, TOKEN_NAME_KEY, TOKEN_SYMBOL_KEY, TOTAL_SUPPLY_KEY,
};
use thiserror::Error;

use crate::error::{state_error_kind, Classify, ErrorKind};

/// Keys in the token namespace that hold metadata rather than balances.
pub const RESERVED_KEYS: [&str; 4] = [TOKEN_NAME_KEY, TOKEN_SYMBOL_KEY, PUBLISHER_KEY, TOTAL_SUPPLY_KEY];

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("account can not be empty")]
    EmptyAccount,

    #[error("account name {0:?} is reserved")]
    ReservedAccount(String),

    /// The stored value is not a non-negative integer.
    #[error("balance of {account} is corrupt: {value:?}")]
    Corrupt { account: String, value: String },

    #[error(transparent)]
    State(#[from] StateError),
}

impl Classify for BalanceError {
    fn kind(&self) -> ErrorKind {
        match self {
            BalanceError::EmptyAccount | BalanceError::ReservedAccount(_) => ErrorKind::Validation,
            BalanceError::Corrupt { .. } => ErrorKind::Dependency,
            BalanceError::State(e) => state_error_kind(e),
        }
    }
}

/// Whether `key` in the token namespace holds a balance.
pub fn is_account_key(key: &str) -> bool {
    !key.is_empty() && !RESERVED_KEYS.contains(&key)
}

fn check_account(account: &str) -> Result<(), BalanceError> {
    if account.is_empty() {
        return Err(BalanceError::EmptyAccount);
    }
    if !is_account_key(account) {
        return Err(BalanceError::ReservedAccount(account.to_string()));
    }
    Ok(())
}

/// Reads the balance of `account`, zero if it was never credited.
pub fn read_balance(stub: &mut dyn ChaincodeStub, account: &str) -> Result<u64, BalanceError> {
    check_account(account)?;
    match stub.get_state(account)? {
        None => Ok(0),
        Some(bytes) => parse_amount(&bytes).ok_or_else(|| BalanceError::Corrupt {
            account: account.to_string(),
            value: String::from_utf8_lossy(&bytes).into_owned(),
        }),
    }
}

/// Overwrites the balance of `account`.
pub fn write_balance(
    stub: &mut dyn ChaincodeStub,
    account: &str,
    balance: u64,
) -> Result<(), BalanceError> {
    check_account(account)?;
    stub.put_state(account, balance.to_string().into_bytes())?;
    Ok(())
}

/// Parses a stored decimal amount.
pub(crate) fn parse_amount(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
