//! Integration tests for the token chaincode.
//!
//! Every call goes through the in-memory ledger: arguments are raw bytes,
//! results are shim responses, and state only changes on commit.

use datamarket_contracts::balance_store::is_account_key;
use datamarket_contracts::{standard_registry, ErrorKind, IssuerPolicy, TokenMetadata};
use datamarket_protocol::config::{DEFAULT_CHANNEL, TOKEN_CHAINCODE};
use datamarket_protocol::identity::SerializedIdentity;
use datamarket_protocol::storage::{LedgerError, MemoryLedger, TxRequest};

fn issuer() -> SerializedIdentity {
    SerializedIdentity::enroll("PMSP", "P", "P", "p.example.com")
}

fn outsider() -> SerializedIdentity {
    SerializedIdentity::enroll("XMSP", "X", "X", "x.example.com")
}

/// Helper: a ledger with `Tok`/`TK` instantiated, 100 units held by `P`.
fn ledger() -> MemoryLedger {
    let ledger = MemoryLedger::new(DEFAULT_CHANNEL, standard_registry(IssuerPolicy::default()));
    ledger
        .instantiate(&TxRequest::new(TOKEN_CHAINCODE, "init").args(["Tok", "TK", "P", "100"]))
        .unwrap();
    ledger
}

fn query(ledger: &MemoryLedger, function: &str, params: &[&str]) -> String {
    let response = ledger
        .evaluate(&TxRequest::new(TOKEN_CHAINCODE, function).args(params))
        .unwrap();
    assert!(response.is_ok(), "{function} failed: {}", response.message);
    response.payload_str()
}

fn balance(ledger: &MemoryLedger, account: &str) -> String {
    query(ledger, "balanceOf", &[account])
}

fn submit(
    ledger: &MemoryLedger,
    creator: Option<SerializedIdentity>,
    function: &str,
    params: &[&str],
) -> Result<String, LedgerError> {
    let mut request = TxRequest::new(TOKEN_CHAINCODE, function).args(params);
    if let Some(creator) = creator {
        request = request.creator(creator);
    }
    ledger
        .submit(&request)
        .map(|receipt| String::from_utf8_lossy(&receipt.payload).into_owned())
}

fn status_of(err: LedgerError) -> i32 {
    match err {
        LedgerError::Endorsement { status, .. } => status,
        other => panic!("expected endorsement failure, got {other:?}"),
    }
}

/// Sum of every balance in the token namespace.
fn sum_of_balances(ledger: &MemoryLedger) -> u64 {
    ledger
        .snapshot()
        .public_entries(TOKEN_CHAINCODE)
        .filter(|(key, _)| is_account_key(key))
        .map(|(_, value)| std::str::from_utf8(value).unwrap().parse::<u64>().unwrap())
        .sum()
}

fn assert_conserved(ledger: &MemoryLedger) {
    let supply: u64 = query(ledger, "totalSupply", &[]).parse().unwrap();
    assert_eq!(sum_of_balances(ledger), supply);
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[test]
fn initialize_mint_transfer_scenario() {
    let ledger = ledger();

    // 1. Initialize
    assert_eq!(balance(&ledger, "P"), "100");
    assert_eq!(query(&ledger, "totalSupply", &[]), "100");

    // 2. Mint by a non-issuer
    let err = submit(&ledger, Some(outsider()), "mint", &["X", "50"]).unwrap_err();
    assert_eq!(status_of(err), ErrorKind::Authorization.status());
    assert_eq!(balance(&ledger, "X"), "0");
    assert_eq!(query(&ledger, "totalSupply", &[]), "100");

    // 3. Mint by the issuer
    submit(&ledger, Some(issuer()), "mint", &["X", "50"]).unwrap();
    assert_eq!(balance(&ledger, "X"), "50");
    assert_eq!(query(&ledger, "totalSupply", &[]), "150");

    // 4. Transfer
    submit(&ledger, None, "transfer", &["X", "Y", "20"]).unwrap();
    assert_eq!(balance(&ledger, "X"), "30");
    assert_eq!(balance(&ledger, "Y"), "20");

    assert_conserved(&ledger);
}

// ---------------------------------------------------------------------------
// Transfer Tests
// ---------------------------------------------------------------------------

#[test]
fn transfer_rejections_leave_balances_unchanged() {
    let ledger = ledger();

    for (amount, status) in [("0", 400), ("-1", 400), ("abc", 400), ("101", 402)] {
        let err = submit(&ledger, None, "transfer", &["P", "Q", amount]).unwrap_err();
        assert_eq!(status_of(err), status, "amount {amount}");
        assert_eq!(balance(&ledger, "P"), "100");
        assert_eq!(balance(&ledger, "Q"), "0");
    }
}

#[test]
fn transfer_of_entire_balance() {
    let ledger = ledger();
    submit(&ledger, None, "transfer", &["P", "Q", "100"]).unwrap();
    assert_eq!(balance(&ledger, "P"), "0");
    assert_eq!(balance(&ledger, "Q"), "100");
    assert_conserved(&ledger);
}

#[test]
fn transfer_emits_event_on_commit() {
    let ledger = ledger();
    let receipt = ledger
        .submit(&TxRequest::new(TOKEN_CHAINCODE, "transfer").args(["P", "Q", "7"]))
        .unwrap();
    assert_eq!(receipt.events.len(), 1);
    assert_eq!(receipt.events[0].name, "transferEvent");
    assert_eq!(receipt.events[0].chaincode, TOKEN_CHAINCODE);
}

#[test]
fn conservation_holds_across_many_operations() {
    let ledger = ledger();
    let steps: [(&str, &[&str], bool); 6] = [
        ("transfer", &["P", "A", "40"], false),
        ("mint", &["A", "25"], true),
        ("transfer", &["A", "B", "60"], false),
        ("mint", &["C", "5"], true),
        ("transfer", &["B", "P", "1"], false),
        ("transfer", &["C", "C", "5"], false),
    ];
    for (function, params, as_issuer) in steps {
        let creator = as_issuer.then(issuer);
        submit(&ledger, creator, function, params).unwrap();
        assert_conserved(&ledger);
    }
    assert_eq!(query(&ledger, "totalSupply", &[]), "130");
}

// ---------------------------------------------------------------------------
// Metadata & Initialization
// ---------------------------------------------------------------------------

#[test]
fn token_info_returns_metadata() {
    let ledger = ledger();
    let info: TokenMetadata = serde_json::from_str(&query(&ledger, "tokenInfo", &[])).unwrap();
    assert_eq!(
        info,
        TokenMetadata {
            name: "Tok".into(),
            symbol: "TK".into(),
            publisher: "P".into(),
            total_supply: 100,
        }
    );
}

#[test]
fn second_initialize_is_rejected() {
    let ledger = ledger();
    let err = ledger
        .instantiate(&TxRequest::new(TOKEN_CHAINCODE, "init").args(["Other", "OT", "Q", "5"]))
        .unwrap_err();
    assert_eq!(status_of(err), 400);
    assert_eq!(balance(&ledger, "Q"), "0");
    assert_eq!(query(&ledger, "totalSupply", &[]), "100");
}

#[test]
fn initialize_validates_fields() {
    let ledger = MemoryLedger::new(DEFAULT_CHANNEL, standard_registry(IssuerPolicy::default()));
    for params in [["", "TK", "P", "1"], ["Tok", "TK", "P", "many"], ["Tok", "TK", "P", "-1"]] {
        let err = ledger
            .instantiate(&TxRequest::new(TOKEN_CHAINCODE, "init").args(params))
            .unwrap_err();
        assert_eq!(status_of(err), 400);
    }
    assert_eq!(ledger.height(), 0);
}

#[test]
fn who_am_i_reports_caller() {
    let ledger = ledger();
    let response = ledger
        .evaluate(&TxRequest::new(TOKEN_CHAINCODE, "whoAmI").creator(issuer()))
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&response.payload).unwrap();
    assert_eq!(json["mspId"], "PMSP");
    assert_eq!(json["commonName"], "P");
}

#[test]
fn pinned_issuer_policy_checks_certificate_authority() {
    let ledger = MemoryLedger::new(
        DEFAULT_CHANNEL,
        standard_registry(IssuerPolicy::pinned_to("p.example.com")),
    );
    ledger
        .instantiate(&TxRequest::new(TOKEN_CHAINCODE, "init").args(["Tok", "TK", "P", "0"]))
        .unwrap();

    let forged = SerializedIdentity::enroll("XMSP", "P", "X", "x.example.com");
    let err = submit(&ledger, Some(forged), "mint", &["X", "1"]).unwrap_err();
    assert_eq!(status_of(err), 403);

    submit(&ledger, Some(issuer()), "mint", &["X", "1"]).unwrap();
    assert_eq!(balance(&ledger, "X"), "1");
}
