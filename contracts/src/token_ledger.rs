//! # Token Ledger
//!
//! A single fungible token on top of the [balance store](crate::balance_store).
//!
//! ## Invariants
//!
//! - Balances are non-negative integers. Arithmetic is checked; an
//!   overflow rejects the operation instead of wrapping.
//! - The sum of all balances equals the stored total supply after every
//!   committed transaction. `initialize` credits the whole initial supply
//!   to the publisher, `transfer` moves value without creating any, and
//!   `mint` raises a balance and the supply by the same amount.
//! - Only the issuer mints. The issuer is the identity whose common name is
//!   the stored publisher, optionally further pinned to one certificate
//!   authority by [`IssuerPolicy`].
//!
//! Every mutating operation is a pure function of the values it read. Two
//! transactions debiting the same account are never reconciled here; the
//! ledger rejects whichever commits second.

use datamarket_protocol::chaincode::{ChaincodeStub, StateError};
use datamarket_protocol::config::{
    MINT_SENDER, PUBLISHER_KEY, TOKEN_NAME_KEY, TOKEN_SYMBOL_KEY, TOTAL_SUPPLY_KEY,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balance_store::{self, read_balance, write_balance, BalanceError};
use crate::error::{state_error_kind, Classify, ErrorKind};
use crate::events::{ContractEvent, EventError, TransferEvent};
use crate::identity::{resolve_caller, CallerIdentity, IdentityError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during token ledger operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token metadata already exists.
    #[error("token already initialized")]
    AlreadyInitialized,

    /// A metadata field was empty.
    #[error("{0} can not be empty")]
    EmptyField(&'static str),

    /// No token metadata has been written yet.
    #[error("token not initialized: {0} missing")]
    NotInitialized(&'static str),

    /// Transfers and mints must move at least one unit.
    #[error("amount must be positive")]
    ZeroAmount,

    /// The sender cannot cover the transfer.
    #[error("insufficient balance: {account} has {balance}, tried to transfer {amount}")]
    InsufficientFunds {
        account: String,
        balance: u64,
        amount: u64,
    },

    /// A balance would exceed the representable range.
    #[error("balance overflow: crediting {amount} to {account}")]
    BalanceOverflow { account: String, amount: u64 },

    /// The total supply would exceed the representable range.
    #[error("supply overflow: minting {amount} on top of {supply}")]
    SupplyOverflow { supply: u64, amount: u64 },

    /// The caller is not the issuer.
    #[error("unauthorized: {caller} is not the token issuer")]
    UnauthorizedMint { caller: String },

    /// Stored metadata could not be decoded.
    #[error("corrupt token metadata under {key}")]
    CorruptMetadata { key: &'static str },

    #[error("failed to encode token data: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl Classify for TokenError {
    fn kind(&self) -> ErrorKind {
        match self {
            TokenError::AlreadyInitialized
            | TokenError::EmptyField(_)
            | TokenError::ZeroAmount
            | TokenError::BalanceOverflow { .. }
            | TokenError::SupplyOverflow { .. } => ErrorKind::Validation,
            TokenError::NotInitialized(_) => ErrorKind::NotFound,
            TokenError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            TokenError::UnauthorizedMint { .. } => ErrorKind::Authorization,
            TokenError::CorruptMetadata { .. } | TokenError::Encoding(_) => ErrorKind::Dependency,
            TokenError::Identity(e) => e.kind(),
            TokenError::Balance(e) => e.kind(),
            TokenError::Event(e) => e.kind(),
            TokenError::State(e) => state_error_kind(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Extra conditions on who counts as the issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerPolicy {
    /// When set, the issuer's certificate must have been issued by a CA of
    /// this organization.
    pub organization: Option<String>,
}

impl IssuerPolicy {
    pub fn pinned_to(organization: impl Into<String>) -> Self {
        Self {
            organization: Some(organization.into()),
        }
    }
}

/// Token metadata as returned by `tokenInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub publisher: String,
    pub total_supply: u64,
}

/// The token ledger. Stateless apart from its issuer policy.
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    policy: IssuerPolicy,
}

impl TokenLedger {
    pub fn new(policy: IssuerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IssuerPolicy {
        &self.policy
    }

    /// Writes the token metadata and credits `initial_supply` to the
    /// publisher. Rejected if the token already exists.
    pub fn initialize(
        &self,
        stub: &mut dyn ChaincodeStub,
        name: &str,
        symbol: &str,
        publisher: &str,
        initial_supply: u64,
    ) -> Result<TokenMetadata, TokenError> {
        for (field, value) in [("name", name), ("symbol", symbol), ("publisher", publisher)] {
            if value.is_empty() {
                return Err(TokenError::EmptyField(field));
            }
        }
        if stub.get_state(TOKEN_NAME_KEY)?.is_some() {
            return Err(TokenError::AlreadyInitialized);
        }

        stub.put_state(TOKEN_NAME_KEY, name.as_bytes().to_vec())?;
        stub.put_state(TOKEN_SYMBOL_KEY, symbol.as_bytes().to_vec())?;
        stub.put_state(PUBLISHER_KEY, publisher.as_bytes().to_vec())?;
        stub.put_state(TOTAL_SUPPLY_KEY, initial_supply.to_string().into_bytes())?;
        write_balance(stub, publisher, initial_supply)?;

        tracing::info!(name, symbol, publisher, initial_supply, "token initialized");
        Ok(TokenMetadata {
            name: name.to_string(),
            symbol: symbol.to_string(),
            publisher: publisher.to_string(),
            total_supply: initial_supply,
        })
    }

    /// Balance of `account`, zero if never credited.
    pub fn balance_of(&self, stub: &mut dyn ChaincodeStub, account: &str) -> Result<u64, TokenError> {
        let balance = read_balance(stub, account)?;
        tracing::debug!(account, balance, "balance read");
        Ok(balance)
    }

    /// Current total supply.
    pub fn total_supply(&self, stub: &mut dyn ChaincodeStub) -> Result<u64, TokenError> {
        let bytes = stub
            .get_state(TOTAL_SUPPLY_KEY)?
            .ok_or(TokenError::NotInitialized(TOTAL_SUPPLY_KEY))?;
        balance_store::parse_amount(&bytes).ok_or(TokenError::CorruptMetadata {
            key: TOTAL_SUPPLY_KEY,
        })
    }

    /// All token metadata.
    pub fn token_info(&self, stub: &mut dyn ChaincodeStub) -> Result<TokenMetadata, TokenError> {
        Ok(TokenMetadata {
            name: read_text(stub, TOKEN_NAME_KEY)?,
            symbol: read_text(stub, TOKEN_SYMBOL_KEY)?,
            publisher: read_text(stub, PUBLISHER_KEY)?,
            total_supply: self.total_supply(stub)?,
        })
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// A transfer to oneself checks funds and emits the event but leaves
    /// the balance as it was.
    pub fn transfer(
        &self,
        stub: &mut dyn ChaincodeStub,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), TokenError> {
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }

        let from_balance = read_balance(stub, from)?;
        let to_balance = read_balance(stub, to)?;

        let new_from = from_balance
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientFunds {
                account: from.to_string(),
                balance: from_balance,
                amount,
            })?;

        if from != to {
            let new_to = to_balance
                .checked_add(amount)
                .ok_or_else(|| TokenError::BalanceOverflow {
                    account: to.to_string(),
                    amount,
                })?;
            write_balance(stub, from, new_from)?;
            write_balance(stub, to, new_to)?;
        }

        ContractEvent::from(TransferEvent {
            sender: from.to_string(),
            recipient: to.to_string(),
            amount,
        })
        .emit(stub)?;

        tracing::info!(tx_id = stub.tx_id(), from, to, amount, "transfer");
        Ok(())
    }

    /// Creates `amount` new tokens in `to`. Issuer only.
    pub fn mint(&self, stub: &mut dyn ChaincodeStub, to: &str, amount: u64) -> Result<(), TokenError> {
        let caller = resolve_caller(stub)?;
        let publisher = read_text(stub, PUBLISHER_KEY)?;
        if !self.is_issuer(&caller, &publisher) {
            tracing::warn!(
                caller = %caller.common_name,
                msp_id = %caller.msp_id,
                "mint refused: caller is not the issuer"
            );
            return Err(TokenError::UnauthorizedMint {
                caller: caller.common_name,
            });
        }
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }

        let supply = self.total_supply(stub)?;
        let balance = read_balance(stub, to)?;
        let new_supply = supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { supply, amount })?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or_else(|| TokenError::BalanceOverflow {
                account: to.to_string(),
                amount,
            })?;

        write_balance(stub, to, new_balance)?;
        stub.put_state(TOTAL_SUPPLY_KEY, new_supply.to_string().into_bytes())?;

        ContractEvent::from(TransferEvent {
            sender: MINT_SENDER.to_string(),
            recipient: to.to_string(),
            amount,
        })
        .emit(stub)?;

        tracing::info!(tx_id = stub.tx_id(), to, amount, new_supply, "minted");
        Ok(())
    }

    /// The resolved identity of the caller.
    pub fn caller(&self, stub: &dyn ChaincodeStub) -> Result<CallerIdentity, TokenError> {
        Ok(resolve_caller(stub)?)
    }

    fn is_issuer(&self, caller: &CallerIdentity, publisher: &str) -> bool {
        if caller.common_name != publisher {
            return false;
        }
        match &self.policy.organization {
            None => true,
            Some(org) => caller.issuer_organization.as_deref() == Some(org.as_str()),
        }
    }
}

fn read_text(stub: &mut dyn ChaincodeStub, key: &'static str) -> Result<String, TokenError> {
    let bytes = stub.get_state(key)?.ok_or(TokenError::NotInitialized(key))?;
    String::from_utf8(bytes).map_err(|_| TokenError::CorruptMetadata { key })
}
