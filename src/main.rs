//! casebridge - MCP tool gateway for case-management DX REST APIs

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use casebridge::auth::TokenCache;
use casebridge::dx::{DxClient, HttpExecutor};
use casebridge::server::{Dispatcher, StdioServer};
use casebridge::tool::{ToolContext, ToolRegistry};
use casebridge::{cli::Cli, config::Config, setup_tracing, tools};

#[tokio::main]
async fn main() -> ExitCode {
    // Local .env for development; absent files are fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            if let Some(secs) = cli.request_timeout_secs {
                config.server.request_timeout = Duration::from_secs(secs);
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        request_timeout = ?config.server.request_timeout,
        "Starting casebridge"
    );

    // Build the registry; duplicate names or invalid descriptors are fatal
    let registry = match ToolRegistry::build(tools::catalog()) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to build tool registry: {e}");
            return ExitCode::FAILURE;
        }
    };

    // One pooled client shared by token exchanges and API calls
    let http = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let tokens = Arc::new(TokenCache::new(http.clone(), config.server.token_timeout));
    let executor = HttpExecutor::new(http, tokens, config.server.request_timeout);
    let client = Arc::new(DxClient::new(executor));
    let ctx = Arc::new(ToolContext::new(client, config.api));

    let dispatcher = Arc::new(Dispatcher::new(registry, ctx));
    let server = StdioServer::new(dispatcher);

    if let Err(e) = server.run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("casebridge shutdown complete");
    ExitCode::SUCCESS
}
