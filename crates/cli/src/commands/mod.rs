pub mod chat;
pub mod config;
pub mod doctor;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use sfmcp_core::config::{AppConfig, ConfigError, LoadOptions, LogFormat};
use sfmcp_crm::{ConnectError, SalesforceOrg};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub const CONFIG_PATH_ENV: &str = "SFMCP_CONFIG";

/// An explicit `SFMCP_CONFIG` path must exist; otherwise the default locations are
/// optional.
pub(crate) fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV).filter(|value| !value.is_empty()).map(PathBuf::from)
}

pub(crate) fn load_config() -> Result<AppConfig, ConfigError> {
    let config_path = config_path();
    AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    })
}

/// Logs go to stderr so command output on stdout stays parseable.
pub(crate) fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A second init (tests, repeated runs) is not an error worth surfacing.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Org handle, connected when credentials are configured. A failed login leaves the
/// org offline and returns the error for the caller to report.
pub(crate) async fn open_org(config: &AppConfig) -> (Arc<SalesforceOrg>, Option<ConnectError>) {
    let org = Arc::new(SalesforceOrg::new(config.salesforce.clone()));
    if !config.salesforce.has_login_credentials() {
        return (org, None);
    }

    match org.connect().await {
        Ok(()) => {
            info!(event_name = "cli.salesforce.connected", "salesforce connection established");
            (org, None)
        }
        Err(error) => {
            warn!(
                event_name = "cli.salesforce.connection_failed",
                error = %error,
                "salesforce connection failed"
            );
            (org, Some(error))
        }
    }
}
