use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["sfmcp.toml", "config/sfmcp.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub salesforce: SalesforceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SalesforceConfig {
    pub login_url: String,
    pub api_version: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub security_token: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub salesforce_login_url: Option<String>,
    pub salesforce_username: Option<String>,
    pub salesforce_password: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: "https://openrouter.ai/api/v1".to_string(),
                model: "openai/gpt-4.1-mini".to_string(),
                temperature: 0.3,
                timeout_secs: 60,
            },
            salesforce: SalesforceConfig {
                login_url: "https://login.salesforce.com".to_string(),
                api_version: "59.0".to_string(),
                username: None,
                password: None,
                security_token: None,
                client_id: None,
                client_secret: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SalesforceConfig {
    /// Username-password grants need all three of these; the client id pair is optional
    /// for orgs that accept the default connected app.
    pub fn has_login_credentials(&self) -> bool {
        let password_set =
            self.password.as_ref().map(|value| !value.expose_secret().is_empty()).unwrap_or(false);
        self.username.as_ref().map(|value| !value.is_empty()).unwrap_or(false) && password_set
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(salesforce) = patch.salesforce {
            if let Some(login_url) = salesforce.login_url {
                self.salesforce.login_url = login_url;
            }
            if let Some(api_version) = salesforce.api_version {
                self.salesforce.api_version = api_version;
            }
            if let Some(username) = salesforce.username {
                self.salesforce.username = Some(username);
            }
            if let Some(password_value) = salesforce.password {
                self.salesforce.password = Some(secret_value(password_value));
            }
            if let Some(security_token_value) = salesforce.security_token {
                self.salesforce.security_token = Some(secret_value(security_token_value));
            }
            if let Some(client_id) = salesforce.client_id {
                self.salesforce.client_id = Some(client_id);
            }
            if let Some(client_secret_value) = salesforce.client_secret {
                self.salesforce.client_secret = Some(secret_value(client_secret_value));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let api_key = read_env("SFMCP_LLM_API_KEY").or_else(|| read_env("OPENROUTER_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SFMCP_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("SFMCP_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SFMCP_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("SFMCP_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("SFMCP_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SFMCP_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SFMCP_SALESFORCE_LOGIN_URL") {
            self.salesforce.login_url = value;
        }
        if let Some(value) = read_env("SFMCP_SALESFORCE_API_VERSION") {
            self.salesforce.api_version = value;
        }
        let username =
            read_env("SFMCP_SALESFORCE_USERNAME").or_else(|| read_env("SALESFORCE_USERNAME"));
        if let Some(value) = username {
            self.salesforce.username = Some(value);
        }
        let password =
            read_env("SFMCP_SALESFORCE_PASSWORD").or_else(|| read_env("SALESFORCE_PASSWORD"));
        if let Some(value) = password {
            self.salesforce.password = Some(secret_value(value));
        }
        let security_token = read_env("SFMCP_SALESFORCE_SECURITY_TOKEN")
            .or_else(|| read_env("SALESFORCE_SECURITY_TOKEN"));
        if let Some(value) = security_token {
            self.salesforce.security_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SFMCP_SALESFORCE_CLIENT_ID") {
            self.salesforce.client_id = Some(value);
        }
        if let Some(value) = read_env("SFMCP_SALESFORCE_CLIENT_SECRET") {
            self.salesforce.client_secret = Some(secret_value(value));
        }

        let log_level = read_env("SFMCP_LOGGING_LEVEL").or_else(|| read_env("SFMCP_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("SFMCP_LOGGING_FORMAT").or_else(|| read_env("SFMCP_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(login_url) = overrides.salesforce_login_url {
            self.salesforce.login_url = login_url;
        }
        if let Some(username) = overrides.salesforce_username {
            self.salesforce.username = Some(username);
        }
        if let Some(password) = overrides.salesforce_password {
            self.salesforce.password = Some(secret_value(password));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_salesforce(&self.salesforce)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !is_http_url(&llm.base_url) {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    // A missing api key is not a startup failure; the model call reports it.
    Ok(())
}

fn validate_salesforce(salesforce: &SalesforceConfig) -> Result<(), ConfigError> {
    if !is_http_url(&salesforce.login_url) {
        return Err(ConfigError::Validation(
            "salesforce.login_url must start with http:// or https://".to_string(),
        ));
    }

    let version_ok = salesforce
        .api_version
        .split_once('.')
        .map(|(major, minor)| {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|ch| ch.is_ascii_digit())
                && minor.chars().all(|ch| ch.is_ascii_digit())
        })
        .unwrap_or(false);
    if !version_ok {
        return Err(ConfigError::Validation(format!(
            "salesforce.api_version must look like `59.0`, got `{}`",
            salesforce.api_version
        )));
    }

    if salesforce.client_secret.is_some() && salesforce.client_id.is_none() {
        return Err(ConfigError::Validation(
            "salesforce.client_secret is set but salesforce.client_id is missing".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    salesforce: Option<SalesforcePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SalesforcePatch {
    login_url: Option<String>,
    api_version: Option<String>,
    username: Option<String>,
    password: Option<String>,
    security_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
