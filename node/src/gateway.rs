//! # Gateway
//!
//! Submits and evaluates transactions on behalf of the organizations in the
//! wallet, the way a client SDK gateway would: pick the identity, simulate,
//! commit, then hand committed events to the listener.
//!
//! A stale read at commit is reported as [`GatewayError::Conflict`]; the
//! gateway does not retry. Callers resubmit.

use std::time::Instant;

use anyhow::Context;
use thiserror::Error;

use datamarket_contracts::{standard_registry, DataMarketInvocation, ErrorKind, IssuerPolicy, TokenInvocation};
use datamarket_protocol::config::{DATA_MARKET_CHAINCODE, TOKEN_CHAINCODE};
use datamarket_protocol::identity::SerializedIdentity;
use datamarket_protocol::storage::{CommitReceipt, LedgerError, MemoryLedger, TxRequest};

use crate::config::NetworkProfile;
use crate::listener::EventListener;
use crate::metrics::SharedMetrics;
use crate::wallet::Wallet;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no identity for organization {0}")]
    UnknownOrganization(String),

    /// The chaincode answered with an error status.
    #[error("{message}")]
    Rejected { status: i32, message: String },

    #[error("transaction {tx_id} conflicted on {key}, resubmit")]
    Conflict { tx_id: String, key: String },

    #[error("chaincode {0} is not deployed")]
    UnknownChaincode(String),
}

impl GatewayError {
    /// Contract error category, for rejections that carry one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            GatewayError::Rejected { status, .. } => ErrorKind::from_status(*status),
            _ => None,
        }
    }
}

impl From<LedgerError> for GatewayError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownChaincode(name) => GatewayError::UnknownChaincode(name),
            LedgerError::Endorsement {
                status, message, ..
            } => GatewayError::Rejected { status, message },
            LedgerError::MvccReadConflict { tx_id, key } => GatewayError::Conflict { tx_id, key },
        }
    }
}

pub struct Gateway {
    profile: NetworkProfile,
    ledger: MemoryLedger,
    wallet: Wallet,
    listener: EventListener,
    metrics: SharedMetrics,
}

impl Gateway {
    /// Deploys both chaincodes and instantiates them as the token publisher.
    pub fn bootstrap(
        profile: NetworkProfile,
        listener: EventListener,
        metrics: SharedMetrics,
    ) -> anyhow::Result<Self> {
        profile.validate()?;

        let policy = match &profile.issuer_organization {
            Some(org) => IssuerPolicy::pinned_to(org.as_str()),
            None => IssuerPolicy::default(),
        };
        let ledger = MemoryLedger::new(profile.channel.as_str(), standard_registry(policy));
        let wallet = Wallet::from_profile(&profile);

        let publisher = profile
            .publisher_organization()
            .context("token publisher is not enrolled")?;
        let creator = wallet
            .identity(&publisher.name)
            .cloned()
            .context("publisher identity missing from wallet")?;

        let token = &profile.token;
        let init = TokenInvocation::Initialize {
            name: token.name.clone(),
            symbol: token.symbol.clone(),
            publisher: token.publisher.clone(),
            initial_supply: token.initial_supply,
        };
        let token_receipt = ledger
            .instantiate(
                &TxRequest::new(TOKEN_CHAINCODE, init.function())
                    .args(init.params())
                    .creator(creator.clone()),
            )
            .context("failed to instantiate token chaincode")?;

        let mut market_init = TxRequest::new(DATA_MARKET_CHAINCODE, "init").creator(creator);
        if let Some(owner) = &profile.market_owner {
            market_init = market_init.arg(owner);
        }
        let market_receipt = ledger
            .instantiate(&market_init)
            .context("failed to instantiate data market chaincode")?;

        listener.publish(TOKEN_CHAINCODE, &token_receipt);
        listener.publish(DATA_MARKET_CHAINCODE, &market_receipt);
        metrics.block_height.set(ledger.height() as i64);

        tracing::info!(
            channel = %profile.channel,
            token = %profile.token.symbol,
            publisher = %publisher.name,
            height = ledger.height(),
            "chaincodes instantiated"
        );

        Ok(Self {
            profile,
            ledger,
            wallet,
            listener,
            metrics,
        })
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Organization used when a request does not name one: the publisher's.
    pub fn default_organization(&self) -> &str {
        self.profile
            .publisher_organization()
            .map(|o| o.name.as_str())
            .unwrap_or_default()
    }

    fn identity(&self, org: &str) -> Result<SerializedIdentity, GatewayError> {
        self.wallet
            .identity(org)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownOrganization(org.to_string()))
    }

    /// Simulates and commits `function(params)` as `org`.
    pub fn submit(
        &self,
        org: &str,
        chaincode: &str,
        function: &str,
        params: Vec<String>,
    ) -> Result<CommitReceipt, GatewayError> {
        let request = TxRequest::new(chaincode, function)
            .args(params)
            .creator(self.identity(org)?);

        self.metrics.transactions_submitted_total.inc();
        let started = Instant::now();
        let result = self.ledger.submit(&request);
        self.metrics
            .transaction_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(receipt) => {
                self.metrics.transactions_committed_total.inc();
                self.metrics.block_height.set(receipt.block_number as i64);
                self.listener.publish(chaincode, &receipt);
                tracing::info!(
                    org,
                    chaincode,
                    function,
                    tx_id = %receipt.tx_id,
                    block = receipt.block_number,
                    "transaction committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                match &err {
                    LedgerError::Endorsement { .. } => {
                        self.metrics.transactions_rejected_total.inc()
                    }
                    LedgerError::MvccReadConflict { .. } => self.metrics.mvcc_conflicts_total.inc(),
                    LedgerError::UnknownChaincode(_) => {}
                }
                Err(err.into())
            }
        }
    }

    /// Simulates `function(params)` as `org` and returns the payload.
    pub fn evaluate(
        &self,
        org: &str,
        chaincode: &str,
        function: &str,
        params: Vec<String>,
    ) -> Result<Vec<u8>, GatewayError> {
        let request = TxRequest::new(chaincode, function)
            .args(params)
            .creator(self.identity(org)?);

        self.metrics.queries_total.inc();
        let response = self.ledger.evaluate(&request)?;
        if !response.is_ok() {
            tracing::debug!(org, chaincode, function, status = response.status, "query failed");
            return Err(GatewayError::Rejected {
                status: response.status,
                message: response.message,
            });
        }
        Ok(response.payload)
    }

    pub fn submit_token(&self, org: &str, invocation: &TokenInvocation) -> Result<CommitReceipt, GatewayError> {
        self.submit(org, TOKEN_CHAINCODE, invocation.function(), invocation.params())
    }

    pub fn evaluate_token(&self, org: &str, invocation: &TokenInvocation) -> Result<Vec<u8>, GatewayError> {
        self.evaluate(org, TOKEN_CHAINCODE, invocation.function(), invocation.params())
    }

    pub fn submit_market(
        &self,
        org: &str,
        invocation: &DataMarketInvocation,
    ) -> Result<CommitReceipt, GatewayError> {
        self.submit(org, DATA_MARKET_CHAINCODE, invocation.function(), invocation.params())
    }

    pub fn evaluate_market(
        &self,
        org: &str,
        invocation: &DataMarketInvocation,
    ) -> Result<Vec<u8>, GatewayError> {
        self.evaluate(org, DATA_MARKET_CHAINCODE, invocation.function(), invocation.params())
    }

    /// Balance of `account` as seen by the default organization.
    pub fn balance_of(&self, account: &str) -> Result<u64, GatewayError> {
        let payload = self.evaluate_token(
            self.default_organization(),
            &TokenInvocation::BalanceOf {
                account: account.to_string(),
            },
        )?;
        String::from_utf8_lossy(&payload)
            .trim()
            .parse()
            .map_err(|_| GatewayError::Rejected {
                status: ErrorKind::Dependency.status(),
                message: format!("balanceOf returned a non-integer for {account}"),
            })
    }
}
