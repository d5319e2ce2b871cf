//! # DataMarket Chaincodes
//!
//! The two contracts of the data market, and the components they are built
//! from:
//!
//! - **Token Ledger** (`erc20`): balances, transfers, issuer-gated minting.
//! - **Commitment Vault**: content records in per-organization private
//!   collections, with their hashes readable by everyone.
//! - **Exchange Orchestrator** (`privateData`): verifies disclosed content
//!   against its stored hash, hands it to the buyer, and charges the fee
//!   through a cross-chaincode transfer in the same transaction.
//! - **Identity Resolver**: caller attributes from the transaction creator.
//!
//! ## Design Principles
//!
//! 1. Contracts hold no state. Everything goes through the
//!    `ChaincodeStub` passed into each call, so the ledger (or a test fake)
//!    decides what is committed.
//! 2. Raw arguments are parsed once into typed invocations; components
//!    never see byte strings.
//! 3. Balance arithmetic is checked everywhere.
//! 4. Every error knows its kind, and every kind has one status code.

pub mod balance_store;
pub mod commitment_vault;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod exchange;
pub mod identity;
pub mod token_ledger;

pub use dispatch::{DataMarketChaincode, DataMarketInvocation, Erc20Chaincode, TokenInvocation};
pub use error::{Classify, ErrorKind, InvocationError};
pub use events::ContractEvent;
pub use exchange::{ChaincodeSettlement, DisclosureRequest, ExchangeOrchestrator, SettlementPort};
pub use token_ledger::{IssuerPolicy, TokenLedger, TokenMetadata};

use datamarket_protocol::config::{DATA_MARKET_CHAINCODE, TOKEN_CHAINCODE};
use datamarket_protocol::storage::ChaincodeRegistry;

/// A registry with both chaincodes deployed under their standard names.
pub fn standard_registry(policy: IssuerPolicy) -> ChaincodeRegistry {
    ChaincodeRegistry::new()
        .register(TOKEN_CHAINCODE, Erc20Chaincode::new(policy))
        .register(DATA_MARKET_CHAINCODE, DataMarketChaincode::default())
}
