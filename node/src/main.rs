// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # DataMarket Gateway Node
//!
//! Entry point for the `datamarket-node` binary. Parses CLI arguments,
//! initializes logging and metrics, instantiates the chaincodes on an
//! in-process ledger, and serves the HTTP/WS API.
//!
//! Subcommands:
//!
//! - `run`: start the gateway
//! - `init`: write a default network profile
//! - `demo`: run the reference scenario and exit
//! - `version`: print build version information

mod api;
mod cli;
mod config;
mod demo;
mod gateway;
mod listener;
mod logging;
mod metrics;
mod wallet;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use cli::{Commands, DataMarketCli};
use config::NetworkProfile;
use gateway::Gateway;
use listener::EventListener;
use logging::LogFormat;
use metrics::NodeMetrics;

/// Broadcast channel capacity for committed events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DataMarketCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_profile(args),
        Commands::Demo(args) => {
            logging::init_logging("warn", LogFormat::Pretty);
            let profile = NetworkProfile::load_or_default(args.profile.as_deref())?;
            demo::run_demo(profile).map(|_| ())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the gateway: API server, metrics endpoint and event listener.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.log_format);

    let profile = NetworkProfile::load_or_default(args.profile.as_deref())?;
    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        channel = %profile.channel,
        organizations = profile.organizations.len(),
        "starting datamarket-node"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let event_listener = EventListener::new(event_tx.clone(), Arc::clone(&node_metrics));
    let listener_task = tokio::spawn(listener::run(event_listener.subscribe()));

    // --- Ledger + chaincodes ---
    let gateway = Gateway::bootstrap(profile, event_listener, Arc::clone(&node_metrics))
        .context("failed to bootstrap gateway")?;

    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway: Arc::new(gateway),
        event_tx: event_tx.clone(),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    listener_task.abort();
    tracing::info!("datamarket-node stopped");
    Ok(())
}

/// Writes the built-in network profile so it can be edited.
fn init_profile(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("datamarket_node=info", LogFormat::Pretty);

    if args.output.exists() && !args.force {
        bail!(
            "{} already exists, pass --force to overwrite",
            args.output.display()
        );
    }

    let profile = NetworkProfile::default();
    profile.save(&args.output)?;
    tracing::info!(path = %args.output.display(), "network profile written");

    println!("Network profile written.");
    println!("  Path          : {}", args.output.display());
    println!("  Channel       : {}", profile.channel);
    println!("  Token         : {} ({})", profile.token.name, profile.token.symbol);
    println!("  Organizations : {}", profile.organizations.len());

    Ok(())
}

fn print_version() {
    println!("datamarket-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc           {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
