//! # Chaincode Dispatch
//!
//! Raw arguments are parsed exactly once, into [`TokenInvocation`] or
//! [`DataMarketInvocation`]. From there on every handler works with typed,
//! validated parameters. The two chaincode types map each invocation onto
//! the component that serves it and turn the outcome into a shim
//! [`Response`].

use datamarket_protocol::chaincode::{Chaincode, ChaincodeStub, Response};
use datamarket_protocol::config::{DEFAULT_MARKET_OWNER, MARKET_OWNER_KEY};

use crate::commitment_vault;
use crate::error::{Classify, InvocationError};
use crate::exchange::{ChaincodeSettlement, DisclosureRequest, ExchangeOrchestrator, SettlementPort};
use crate::token_ledger::{IssuerPolicy, TokenError, TokenLedger};

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

fn utf8_args(args: &[Vec<u8>]) -> Result<Vec<String>, InvocationError> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            String::from_utf8(arg.clone()).map_err(|_| InvocationError::NonUtf8 { index })
        })
        .collect()
}

/// Splits `args` into the function name and its parameters.
fn split_function(args: &[Vec<u8>]) -> Result<(String, Vec<String>), InvocationError> {
    let mut args = utf8_args(args)?;
    if args.is_empty() || args[0].is_empty() {
        return Err(InvocationError::MissingFunction);
    }
    let function = args.remove(0);
    Ok((function, args))
}

/// Requires exactly `N` parameters.
fn exact<const N: usize>(function: &str, params: Vec<String>) -> Result<[String; N], InvocationError> {
    let got = params.len();
    <[String; N]>::try_from(params).map_err(|_| InvocationError::ParamCount {
        function: function.to_string(),
        expected: N.to_string(),
        got,
    })
}

/// Parses a non-negative decimal token amount.
pub fn parse_amount(param: &'static str, value: &str) -> Result<u64, InvocationError> {
    if value.is_empty() {
        return Err(InvocationError::EmptyParam { param });
    }
    match value.parse::<u64>() {
        Ok(amount) => Ok(amount),
        Err(_) => match value.parse::<i128>() {
            Ok(n) if n < 0 => Err(InvocationError::NegativeAmount {
                param,
                value: value.to_string(),
            }),
            _ => Err(InvocationError::InvalidInteger {
                param,
                value: value.to_string(),
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Token chaincode
// ---------------------------------------------------------------------------

/// A call to the token chaincode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenInvocation {
    Initialize {
        name: String,
        symbol: String,
        publisher: String,
        initial_supply: u64,
    },
    BalanceOf {
        account: String,
    },
    TotalSupply,
    TokenInfo,
    Transfer {
        from: String,
        to: String,
        amount: u64,
    },
    Mint {
        to: String,
        amount: u64,
    },
    WhoAmI,
}

impl TokenInvocation {
    /// Parses invoke arguments: function name first.
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, InvocationError> {
        let (function, params) = split_function(args)?;
        Self::from_parts(&function, params)
    }

    /// Parses instantiate arguments. The function name is ignored and the
    /// parameters are always those of `initialize`.
    pub fn parse_init(args: &[Vec<u8>]) -> Result<Self, InvocationError> {
        let params = utf8_args(args.get(1..).unwrap_or_default())?;
        Self::from_parts("initialize", params)
    }

    fn from_parts(function: &str, params: Vec<String>) -> Result<Self, InvocationError> {
        let invocation = match function {
            "initialize" => {
                let [name, symbol, publisher, supply] = exact::<4>(function, params)?;
                TokenInvocation::Initialize {
                    name,
                    symbol,
                    publisher,
                    initial_supply: parse_amount("initialSupply", &supply)?,
                }
            }
            "balanceOf" => {
                let [account] = exact::<1>(function, params)?;
                TokenInvocation::BalanceOf { account }
            }
            "totalSupply" => {
                let [] = exact::<0>(function, params)?;
                TokenInvocation::TotalSupply
            }
            "tokenInfo" | "getTokenInfor" => {
                let [] = exact::<0>(function, params)?;
                TokenInvocation::TokenInfo
            }
            "transfer" => {
                let [from, to, amount] = exact::<3>(function, params)?;
                TokenInvocation::Transfer {
                    from,
                    to,
                    amount: parse_amount("amount", &amount)?,
                }
            }
            "mint" => {
                let [to, amount] = exact::<2>(function, params)?;
                TokenInvocation::Mint {
                    to,
                    amount: parse_amount("amount", &amount)?,
                }
            }
            "whoAmI" => {
                let [] = exact::<0>(function, params)?;
                TokenInvocation::WhoAmI
            }
            other => return Err(InvocationError::UnknownFunction(other.to_string())),
        };
        Ok(invocation)
    }

    /// Function name on the wire.
    pub fn function(&self) -> &'static str {
        match self {
            TokenInvocation::Initialize { .. } => "initialize",
            TokenInvocation::BalanceOf { .. } => "balanceOf",
            TokenInvocation::TotalSupply => "totalSupply",
            TokenInvocation::TokenInfo => "tokenInfo",
            TokenInvocation::Transfer { .. } => "transfer",
            TokenInvocation::Mint { .. } => "mint",
            TokenInvocation::WhoAmI => "whoAmI",
        }
    }

    /// Parameters on the wire, without the function name.
    pub fn params(&self) -> Vec<String> {
        match self {
            TokenInvocation::Initialize {
                name,
                symbol,
                publisher,
                initial_supply,
            } => vec![
                name.clone(),
                symbol.clone(),
                publisher.clone(),
                initial_supply.to_string(),
            ],
            TokenInvocation::BalanceOf { account } => vec![account.clone()],
            TokenInvocation::Transfer { from, to, amount } => {
                vec![from.clone(), to.clone(), amount.to_string()]
            }
            TokenInvocation::Mint { to, amount } => vec![to.clone(), amount.to_string()],
            TokenInvocation::TotalSupply | TokenInvocation::TokenInfo | TokenInvocation::WhoAmI => {
                Vec::new()
            }
        }
    }
}

/// The token chaincode, deployed as `erc20`.
#[derive(Debug, Clone, Default)]
pub struct Erc20Chaincode {
    ledger: TokenLedger,
}

impl Erc20Chaincode {
    pub fn new(policy: IssuerPolicy) -> Self {
        Self {
            ledger: TokenLedger::new(policy),
        }
    }

    /// Runs a parsed invocation.
    pub fn execute(&self, stub: &mut dyn ChaincodeStub, invocation: TokenInvocation) -> Response {
        let function = invocation.function();
        match self.dispatch(stub, invocation) {
            Ok(payload) => Response::success(payload),
            Err(err) => {
                tracing::warn!(tx_id = stub.tx_id(), function, error = %err, "token invocation failed");
                err.to_response(function)
            }
        }
    }

    fn dispatch(
        &self,
        stub: &mut dyn ChaincodeStub,
        invocation: TokenInvocation,
    ) -> Result<Vec<u8>, TokenError> {
        let ledger = &self.ledger;
        match invocation {
            TokenInvocation::Initialize {
                name,
                symbol,
                publisher,
                initial_supply,
            } => {
                let metadata = ledger.initialize(stub, &name, &symbol, &publisher, initial_supply)?;
                Ok(serde_json::to_vec(&metadata)?)
            }
            TokenInvocation::BalanceOf { account } => {
                Ok(ledger.balance_of(stub, &account)?.to_string().into_bytes())
            }
            TokenInvocation::TotalSupply => Ok(ledger.total_supply(stub)?.to_string().into_bytes()),
            TokenInvocation::TokenInfo => Ok(serde_json::to_vec(&ledger.token_info(stub)?)?),
            TokenInvocation::Transfer { from, to, amount } => {
                ledger.transfer(stub, &from, &to, amount)?;
                Ok(format!("transferred {amount} from {from} to {to}").into_bytes())
            }
            TokenInvocation::Mint { to, amount } => {
                ledger.mint(stub, &to, amount)?;
                Ok(format!("minted {amount} to {to}").into_bytes())
            }
            TokenInvocation::WhoAmI => Ok(serde_json::to_vec(&ledger.caller(stub)?)?),
        }
    }
}

impl Chaincode for Erc20Chaincode {
    fn init(&self, stub: &mut dyn ChaincodeStub, args: &[Vec<u8>]) -> Response {
        match TokenInvocation::parse_init(args) {
            Ok(invocation) => self.execute(stub, invocation),
            Err(err) => err.to_response("init"),
        }
    }

    fn invoke(&self, stub: &mut dyn ChaincodeStub, args: &[Vec<u8>]) -> Response {
        match TokenInvocation::parse(args) {
            Ok(invocation) => self.execute(stub, invocation),
            Err(err) => {
                tracing::warn!(tx_id = stub.tx_id(), error = %err, "rejected token invocation");
                err.to_response("invoke")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DataMarket chaincode
// ---------------------------------------------------------------------------

/// A call to the data market chaincode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMarketInvocation {
    /// `[description]` or `[owner, description]`.
    UploadPrivateData {
        owner: Option<String>,
        description: String,
    },
    /// `[ownerOrg, contentId, claimedContent, buyer, seller]`.
    CompareAndPutPrivateData(DisclosureRequest),
    /// `[contentId, ownerOrg]`.
    GetPrivateData { content_id: String, owner_org: String },
}

impl DataMarketInvocation {
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, InvocationError> {
        let (function, params) = split_function(args)?;
        let invocation = match function.as_str() {
            "uploadPrivateData" => match params.len() {
                1 => {
                    let [description] = exact::<1>(&function, params)?;
                    DataMarketInvocation::UploadPrivateData {
                        owner: None,
                        description,
                    }
                }
                2 => {
                    let [owner, description] = exact::<2>(&function, params)?;
                    DataMarketInvocation::UploadPrivateData {
                        owner: Some(owner),
                        description,
                    }
                }
                got => {
                    return Err(InvocationError::ParamCount {
                        function: function.clone(),
                        expected: "1 or 2".to_string(),
                        got,
                    })
                }
            },
            "compareAndPutPrivateData" => {
                let [owner_org, content_id, claimed, buyer, seller] = exact::<5>(&function, params)?;
                DataMarketInvocation::CompareAndPutPrivateData(DisclosureRequest {
                    owner_org,
                    content_id,
                    claimed_content: claimed.into_bytes(),
                    buyer,
                    seller,
                })
            }
            "getPrivateData" => {
                let [content_id, owner_org] = exact::<2>(&function, params)?;
                DataMarketInvocation::GetPrivateData {
                    content_id,
                    owner_org,
                }
            }
            _ => return Err(InvocationError::UnknownFunction(function.clone())),
        };
        Ok(invocation)
    }

    pub fn function(&self) -> &'static str {
        match self {
            DataMarketInvocation::UploadPrivateData { .. } => "uploadPrivateData",
            DataMarketInvocation::CompareAndPutPrivateData(_) => "compareAndPutPrivateData",
            DataMarketInvocation::GetPrivateData { .. } => "getPrivateData",
        }
    }

    pub fn params(&self) -> Vec<String> {
        match self {
            DataMarketInvocation::UploadPrivateData { owner, description } => owner
                .iter()
                .cloned()
                .chain(std::iter::once(description.clone()))
                .collect(),
            DataMarketInvocation::CompareAndPutPrivateData(req) => vec![
                req.owner_org.clone(),
                req.content_id.clone(),
                String::from_utf8_lossy(&req.claimed_content).into_owned(),
                req.buyer.clone(),
                req.seller.clone(),
            ],
            DataMarketInvocation::GetPrivateData {
                content_id,
                owner_org,
            } => vec![content_id.clone(), owner_org.clone()],
        }
    }
}

/// The data market chaincode, deployed as `privateData`.
#[derive(Debug, Clone)]
pub struct DataMarketChaincode<S = ChaincodeSettlement> {
    exchange: ExchangeOrchestrator<S>,
}

impl Default for DataMarketChaincode<ChaincodeSettlement> {
    fn default() -> Self {
        Self::new(ChaincodeSettlement::default())
    }
}

impl<S: SettlementPort> DataMarketChaincode<S> {
    pub fn new(settlement: S) -> Self {
        Self {
            exchange: ExchangeOrchestrator::new(settlement),
        }
    }

    pub fn with_exchange(exchange: ExchangeOrchestrator<S>) -> Self {
        Self { exchange }
    }

    /// Runs a parsed invocation.
    pub fn execute(&self, stub: &mut dyn ChaincodeStub, invocation: DataMarketInvocation) -> Response {
        let function = invocation.function();
        let result = match invocation {
            DataMarketInvocation::UploadPrivateData { owner, description } => {
                commitment_vault::upload(stub, owner.as_deref(), &description)
                    .map(|(_, bytes)| bytes)
                    .map_err(|e| e.to_response(function))
            }
            DataMarketInvocation::CompareAndPutPrivateData(request) => self
                .exchange
                .compare_and_disclose(stub, &request)
                .map_err(|e| e.to_response(function))
                .and_then(|disclosure| {
                    serde_json::to_vec(&disclosure)
                        .map_err(|e| Response::error(format!("{function}: {e}")))
                }),
            DataMarketInvocation::GetPrivateData {
                content_id,
                owner_org,
            } => commitment_vault::retrieve(stub, &owner_org, &content_id)
                .map_err(|e| e.to_response(function)),
        };
        match result {
            Ok(payload) => Response::success(payload),
            Err(response) => {
                tracing::warn!(
                    tx_id = stub.tx_id(),
                    function,
                    status = response.status,
                    message = %response.message,
                    "data market invocation failed"
                );
                response
            }
        }
    }
}

impl<S: SettlementPort> Chaincode for DataMarketChaincode<S> {
    /// Records the market owner. Re-running it on upgrade overwrites it.
    fn init(&self, stub: &mut dyn ChaincodeStub, args: &[Vec<u8>]) -> Response {
        let owner = match args.get(1) {
            Some(owner) if !owner.is_empty() => owner.clone(),
            _ => DEFAULT_MARKET_OWNER.as_bytes().to_vec(),
        };
        match stub.put_state(MARKET_OWNER_KEY, owner) {
            Ok(()) => Response::success(b"Chaincode init successfully".to_vec()),
            Err(e) => Response::error(format!("init: {e}")),
        }
    }

    fn invoke(&self, stub: &mut dyn ChaincodeStub, args: &[Vec<u8>]) -> Response {
        match DataMarketInvocation::parse(args) {
            Ok(invocation) => self.execute(stub, invocation),
            Err(err) => {
                tracing::warn!(tx_id = stub.tx_id(), error = %err, "rejected data market invocation");
                err.to_response("invoke")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|p| p.as_bytes().to_vec()).collect()
    }

    #[test]
    fn parses_transfer() {
        let inv = TokenInvocation::parse(&args(&["transfer", "A", "B", "20"])).unwrap();
        assert_eq!(
            inv,
            TokenInvocation::Transfer {
                from: "A".into(),
                to: "B".into(),
                amount: 20,
            }
        );
        assert_eq!(inv.params(), vec!["A", "B", "20"]);
    }

    #[test]
    fn wrong_param_count_rejected() {
        let err = TokenInvocation::parse(&args(&["balanceOf"])).unwrap_err();
        assert_eq!(
            err,
            InvocationError::ParamCount {
                function: "balanceOf".into(),
                expected: "1".into(),
                got: 0,
            }
        );
    }

    #[test]
    fn amounts_are_validated() {
        assert!(matches!(
            TokenInvocation::parse(&args(&["mint", "X", "-5"])),
            Err(InvocationError::NegativeAmount { .. })
        ));
        assert!(matches!(
            TokenInvocation::parse(&args(&["mint", "X", "1.5"])),
            Err(InvocationError::InvalidInteger { .. })
        ));
        assert!(matches!(
            TokenInvocation::parse(&args(&["mint", "X", ""])),
            Err(InvocationError::EmptyParam { param: "amount" })
        ));
    }

    #[test]
    fn init_ignores_function_name() {
        let inv = TokenInvocation::parse_init(&args(&["init", "Tok", "TK", "P", "100"])).unwrap();
        assert_eq!(inv.function(), "initialize");
        assert!(TokenInvocation::parse_init(&args(&["init", "Tok"])).is_err());
    }

    #[test]
    fn legacy_token_info_name_accepted() {
        assert_eq!(
            TokenInvocation::parse(&args(&["getTokenInfor"])).unwrap(),
            TokenInvocation::TokenInfo
        );
    }

    #[test]
    fn unknown_and_missing_functions_rejected() {
        assert_eq!(
            TokenInvocation::parse(&args(&["approve", "a", "1"])).unwrap_err(),
            InvocationError::UnknownFunction("approve".into())
        );
        assert_eq!(
            DataMarketInvocation::parse(&[]).unwrap_err(),
            InvocationError::MissingFunction
        );
    }

    #[test]
    fn non_utf8_argument_rejected() {
        let raw = vec![b"balanceOf".to_vec(), vec![0xff, 0xfe]];
        assert_eq!(
            TokenInvocation::parse(&raw).unwrap_err(),
            InvocationError::NonUtf8 { index: 1 }
        );
    }

    #[test]
    fn upload_takes_one_or_two_params() {
        assert_eq!(
            DataMarketInvocation::parse(&args(&["uploadPrivateData", "desc"])).unwrap(),
            DataMarketInvocation::UploadPrivateData {
                owner: None,
                description: "desc".into(),
            }
        );
        let two = DataMarketInvocation::parse(&args(&["uploadPrivateData", "Org", "desc"])).unwrap();
        assert_eq!(two.params(), vec!["Org", "desc"]);
        assert!(DataMarketInvocation::parse(&args(&["uploadPrivateData"])).is_err());
    }

    #[test]
    fn compare_and_put_carries_disclosure_request() {
        let inv = DataMarketInvocation::parse(&args(&[
            "compareAndPutPrivateData",
            "IntageMSP",
            "tx1",
            "{\"id\":\"tx1\"}",
            "WS1",
            "Intage",
        ]))
        .unwrap();
        match inv {
            DataMarketInvocation::CompareAndPutPrivateData(req) => {
                assert_eq!(req.owner_org, "IntageMSP");
                assert_eq!(req.claimed_content, b"{\"id\":\"tx1\"}");
                assert_eq!(req.buyer, "WS1");
                assert_eq!(req.seller, "Intage");
            }
            other => panic!("unexpected invocation: {other:?}"),
        }
    }
}
