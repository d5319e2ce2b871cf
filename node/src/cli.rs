//! # CLI Interface
//!
//! Command-line arguments for `datamarket-node`: `run`, `init`, `demo` and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// DataMarket gateway node.
///
/// Hosts the token and data market chaincodes on an in-process ledger and
/// serves them over REST and WebSocket on behalf of the organizations in
/// the network profile.
#[derive(Parser, Debug)]
#[command(
    name = "datamarket-node",
    about = "DataMarket gateway node",
    version,
    propagate_version = true
)]
pub struct DataMarketCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway.
    Run(RunArgs),
    /// Write a default network profile.
    Init(InitArgs),
    /// Run the reference scenario against an in-process ledger and exit.
    Demo(DemoArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Network profile (JSON). The built-in two-organization profile is used
    /// when omitted.
    #[arg(long, short = 'p', env = "DATAMARKET_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Port for the REST and WebSocket API.
    #[arg(long, env = "DATAMARKET_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "DATAMARKET_METRICS_PORT", default_value_t = 9464)]
    pub metrics_port: u16,

    /// Log format: `pretty` or `json`.
    #[arg(long, env = "DATAMARKET_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the profile.
    #[arg(long, short = 'o', default_value = "network-profile.json")]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    #[arg(long, short = 'p', env = "DATAMARKET_PROFILE")]
    pub profile: Option<PathBuf>,
}
