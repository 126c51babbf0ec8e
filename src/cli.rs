//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// MCP tool gateway for case-management DX REST APIs
#[derive(Parser, Debug)]
#[command(name = "casebridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CASEBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "CASEBRIDGE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CASEBRIDGE_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Outbound request timeout in seconds (overrides config)
    #[arg(long, env = "CASEBRIDGE_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,
}
