//! The `demo` command: issuance, a refused mint, a transfer, and a paid
//! disclosure between the publisher's organization and a buyer, printed
//! step by step.

use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;

use datamarket_contracts::{DataMarketInvocation, DisclosureRequest, ErrorKind, TokenInvocation};

use crate::config::NetworkProfile;
use crate::gateway::Gateway;
use crate::listener::EventListener;
use crate::metrics::NodeMetrics;

/// What the scenario ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoOutcome {
    pub publisher_balance: u64,
    pub buyer_balance: u64,
    pub total_supply: u64,
    pub block_height: u64,
}

pub fn run_demo(profile: NetworkProfile) -> Result<DemoOutcome> {
    let metrics = Arc::new(NodeMetrics::new());
    let (event_tx, _) = broadcast::channel(64);
    let gateway = Gateway::bootstrap(
        profile,
        EventListener::new(event_tx, Arc::clone(&metrics)),
        metrics,
    )?;

    let profile = gateway.profile().clone();
    let publisher = profile
        .publisher_organization()
        .context("token publisher is not enrolled")?;
    let buyer = profile
        .organizations
        .iter()
        .find(|o| o.name != publisher.name)
        .context("the demo needs a second organization")?;
    let seller_account = profile.token.publisher.as_str();
    let buyer_account = buyer.common_name.as_str();

    println!(
        "Token {} ({}) issued to {}: {}",
        profile.token.name,
        profile.token.symbol,
        seller_account,
        gateway.balance_of(seller_account)?
    );

    let mint = TokenInvocation::Mint {
        to: buyer_account.to_string(),
        amount: 10,
    };
    match gateway.submit_token(&buyer.name, &mint) {
        Ok(_) => bail!("{} was allowed to mint", buyer.name),
        Err(e) if e.kind() == Some(ErrorKind::Authorization) => {
            println!("Mint by {} refused: {}", buyer.name, e)
        }
        Err(e) => return Err(anyhow!("unexpected mint failure: {e}")),
    }

    gateway.submit_token(&publisher.name, &mint)?;
    println!("{} minted 10 to {}", publisher.name, buyer_account);

    let transfer = TokenInvocation::Transfer {
        from: buyer_account.to_string(),
        to: seller_account.to_string(),
        amount: 3,
    };
    gateway.submit_token(&buyer.name, &transfer)?;
    println!("{} transferred 3 to {}", buyer_account, seller_account);

    let upload = DataMarketInvocation::UploadPrivateData {
        owner: None,
        description: "consumer panel survey".into(),
    };
    let receipt = gateway.submit_market(&publisher.name, &upload)?;
    let record = receipt.payload.clone();
    println!(
        "{} committed content {}: {}",
        publisher.name,
        receipt.tx_id,
        String::from_utf8_lossy(&record)
    );

    let disclose = DataMarketInvocation::CompareAndPutPrivateData(DisclosureRequest {
        owner_org: publisher.msp_id.clone(),
        content_id: receipt.tx_id.clone(),
        claimed_content: record,
        buyer: buyer_account.to_string(),
        seller: seller_account.to_string(),
    });
    let disclosed = gateway.submit_market(&buyer.name, &disclose)?;
    println!(
        "Disclosed to {} in block {}: {}",
        buyer.msp_id,
        disclosed.block_number,
        String::from_utf8_lossy(&disclosed.payload)
    );

    let copy = gateway.evaluate_market(
        &buyer.name,
        &DataMarketInvocation::GetPrivateData {
            content_id: receipt.tx_id,
            owner_org: buyer.msp_id.clone(),
        },
    )?;
    println!("{} reads its copy: {}", buyer.name, String::from_utf8_lossy(&copy));

    let supply_bytes = gateway.evaluate_token(&publisher.name, &TokenInvocation::TotalSupply)?;
    let outcome = DemoOutcome {
        publisher_balance: gateway.balance_of(seller_account)?,
        buyer_balance: gateway.balance_of(buyer_account)?,
        total_supply: String::from_utf8_lossy(&supply_bytes)
            .parse()
            .context("total supply is not an integer")?,
        block_height: gateway.ledger().height(),
    };

    println!();
    println!("  {:<10}: {}", seller_account, outcome.publisher_balance);
    println!("  {:<10}: {}", buyer_account, outcome.buyer_balance);
    println!("  Supply    : {}", outcome.total_supply);
    println!("  Height    : {}", outcome.block_height);
    println!("  State root: {}", hex::encode(gateway.ledger().state_root()));

    Ok(outcome)
}
