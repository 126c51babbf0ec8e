//! casebridge
//!
//! MCP tool gateway for enterprise case-management DX REST APIs.
//!
//! The server speaks the Model Context Protocol over stdio and exposes one
//! tool per DX operation: cases, assignments, attachments, data views, and
//! case types. Each invocation validates its arguments, resolves an
//! effective OAuth2 identity (process defaults plus an optional
//! per-invocation override), calls the upstream REST endpoint with cached
//! bearer credentials, and shapes the outcome into Markdown.
//!
//! # Subsystems
//!
//! - [`tool`] — the uniform tool contract, descriptor schemas, and registry
//! - [`dx`] — request construction, the HTTP executor, and the eTag helper
//! - [`auth`] — per-fingerprint OAuth2 token cache with coalesced refreshes
//! - [`session`] — per-invocation configuration resolution
//! - [`format`] — the pure Markdown response shaper
//! - [`server`] — JSON-RPC dispatch and the stdio transport

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod dx;
pub mod error;
pub mod format;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tool;
pub mod tools;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging.
///
/// The MCP transport owns stdout, so every log line goes to stderr.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
