//! # Protocol Configuration & Constants
//!
//! Every name the contracts and the runtime have to agree on lives here.
//! A chaincode name or state key spelled differently in two places is a
//! transaction that silently reads zero, so nothing below is duplicated
//! anywhere else.

// ---------------------------------------------------------------------------
// Chaincodes & Channels
// ---------------------------------------------------------------------------

/// Name under which the fungible token contract is deployed.
pub const TOKEN_CHAINCODE: &str = "erc20";

/// Name under which the private-data exchange contract is deployed.
pub const DATA_MARKET_CHAINCODE: &str = "privateData";

/// Channel both contracts are deployed on.
pub const DEFAULT_CHANNEL: &str = "mychannel";

/// Prefix of the implicit per-organization private data collection.
/// The full collection name is `_implicit_org_<MSP id>`.
pub const IMPLICIT_COLLECTION_PREFIX: &str = "_implicit_org_";

/// Builds the implicit collection name for an organization's MSP id.
pub fn implicit_collection(msp_id: &str) -> String {
    format!("{IMPLICIT_COLLECTION_PREFIX}{msp_id}")
}

/// Extracts the MSP id from an implicit collection name, if it is one.
pub fn implicit_collection_owner(collection: &str) -> Option<&str> {
    collection
        .strip_prefix(IMPLICIT_COLLECTION_PREFIX)
        .filter(|msp| !msp.is_empty())
}

// ---------------------------------------------------------------------------
// Token Metadata Keys
// ---------------------------------------------------------------------------

/// World-state key holding the token name.
pub const TOKEN_NAME_KEY: &str = "tokenName";

/// World-state key holding the token symbol.
pub const TOKEN_SYMBOL_KEY: &str = "tokenSymbol";

/// World-state key holding the publisher (issuer principal).
pub const PUBLISHER_KEY: &str = "publisher";

/// World-state key holding the total supply as a decimal string.
pub const TOTAL_SUPPLY_KEY: &str = "totalSupply";

/// World-state key recording the market operator of the exchange contract.
pub const MARKET_OWNER_KEY: &str = "marketOwner";

/// Market owner recorded when the exchange contract is instantiated
/// without an explicit one.
pub const DEFAULT_MARKET_OWNER: &str = "Intage";

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Fee, in whole tokens, paid by the buyer for each disclosure.
pub const DISCLOSURE_FEE: u64 = 1;

/// Sender recorded on the transfer event emitted by a mint.
pub const MINT_SENDER: &str = "0x0";

// ---------------------------------------------------------------------------
// Shim Status Codes
// ---------------------------------------------------------------------------

/// Status of a successful chaincode response.
pub const STATUS_OK: i32 = 200;

/// Responses at or above this status are errors.
pub const STATUS_ERROR_THRESHOLD: i32 = 400;

/// Generic chaincode failure status.
pub const STATUS_ERROR: i32 = 500;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Output length in bytes of every digest the ledger computes.
pub const HASH_OUTPUT_LENGTH: usize = 32;
