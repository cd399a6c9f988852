//! Salesforce MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Credentials from the environment
//! SALESFORCE_USERNAME=admin@example.com SALESFORCE_PASSWORD=... \
//! SALESFORCE_SECURITY_TOKEN=... sfmcp-mcp
//!
//! # Or from a config file
//! SFMCP_CONFIG=./sfmcp.toml sfmcp-mcp
//! ```
//!
//! Stdout carries the protocol stream, so logs always go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use sfmcp_core::config::{AppConfig, LoadOptions, LogFormat};
use sfmcp_core::Dispatcher;
use sfmcp_crm::SalesforceOrg;
use sfmcp_mcp::SalesforceMcpServer;
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var_os("SFMCP_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    })?;
    init_logging(&config);

    info!(event_name = "mcp.bootstrap.starting", "starting Salesforce MCP server");

    let org = Arc::new(SalesforceOrg::new(config.salesforce.clone()));
    if config.salesforce.has_login_credentials() {
        match org.connect().await {
            Ok(()) => {
                info!(event_name = "mcp.bootstrap.connected", "salesforce connection established")
            }
            Err(error) => warn!(
                event_name = "mcp.bootstrap.connection_failed",
                error = %error,
                "salesforce connection failed; live-only tools are hidden"
            ),
        }
    } else {
        warn!(
            event_name = "mcp.bootstrap.no_credentials",
            "salesforce credentials not configured; live-only tools are hidden"
        );
    }

    SalesforceMcpServer::new(Dispatcher::new(org)).run_stdio().await
}
