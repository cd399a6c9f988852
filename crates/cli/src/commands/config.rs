use std::env;
use std::fs;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use sfmcp_core::config::{resolve_config_path, AppConfig};
use toml::Value;

use crate::commands::{config_path, load_config};

struct ConfigLine {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(config_path().as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for line in config_lines(&config) {
        let source = field_source(
            line.key,
            line.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(line.key, &line.value, source));
    }

    lines.join("\n")
}

fn config_lines(config: &AppConfig) -> Vec<ConfigLine> {
    let llm = &config.llm;
    let salesforce = &config.salesforce;

    vec![
        ConfigLine {
            key: "llm.api_key",
            value: redact_secret(llm.api_key.as_ref()),
            env_keys: &["SFMCP_LLM_API_KEY", "OPENROUTER_API_KEY"],
        },
        ConfigLine {
            key: "llm.base_url",
            value: llm.base_url.clone(),
            env_keys: &["SFMCP_LLM_BASE_URL"],
        },
        ConfigLine { key: "llm.model", value: llm.model.clone(), env_keys: &["SFMCP_LLM_MODEL"] },
        ConfigLine {
            key: "llm.temperature",
            value: llm.temperature.to_string(),
            env_keys: &["SFMCP_LLM_TEMPERATURE"],
        },
        ConfigLine {
            key: "llm.timeout_secs",
            value: llm.timeout_secs.to_string(),
            env_keys: &["SFMCP_LLM_TIMEOUT_SECS"],
        },
        ConfigLine {
            key: "salesforce.login_url",
            value: salesforce.login_url.clone(),
            env_keys: &["SFMCP_SALESFORCE_LOGIN_URL"],
        },
        ConfigLine {
            key: "salesforce.api_version",
            value: salesforce.api_version.clone(),
            env_keys: &["SFMCP_SALESFORCE_API_VERSION"],
        },
        ConfigLine {
            key: "salesforce.username",
            value: salesforce.username.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["SFMCP_SALESFORCE_USERNAME", "SALESFORCE_USERNAME"],
        },
        ConfigLine {
            key: "salesforce.password",
            value: redact_secret(salesforce.password.as_ref()),
            env_keys: &["SFMCP_SALESFORCE_PASSWORD", "SALESFORCE_PASSWORD"],
        },
        ConfigLine {
            key: "salesforce.security_token",
            value: redact_secret(salesforce.security_token.as_ref()),
            env_keys: &["SFMCP_SALESFORCE_SECURITY_TOKEN", "SALESFORCE_SECURITY_TOKEN"],
        },
        ConfigLine {
            key: "salesforce.client_id",
            value: salesforce.client_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["SFMCP_SALESFORCE_CLIENT_ID"],
        },
        ConfigLine {
            key: "salesforce.client_secret",
            value: redact_secret(salesforce.client_secret.as_ref()),
            env_keys: &["SFMCP_SALESFORCE_CLIENT_SECRET"],
        },
        ConfigLine {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SFMCP_LOGGING_LEVEL", "SFMCP_LOG_LEVEL"],
        },
        ConfigLine {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["SFMCP_LOGGING_FORMAT", "SFMCP_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_hit = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = env_hit {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Secrets never print; only whether one is present.
fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|value| value.expose_secret().trim().is_empty()) {
        None => "<unset>".to_string(),
        Some(true) => "<empty>".to_string(),
        Some(false) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_are_never_echoed() {
        let secret = SecretString::from("hunter2token".to_string());
        assert_eq!(redact_secret(Some(&secret)), "<redacted>");
        assert_eq!(redact_secret(Some(&SecretString::from(" ".to_string()))), "<empty>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn nested_keys_are_found_in_file_documents() {
        let doc = "[salesforce]\nusername = \"admin@example.com\"\n"
            .parse::<Value>()
            .expect("valid toml");
        assert!(contains_path(&doc, "salesforce.username"));
        assert!(!contains_path(&doc, "salesforce.password"));
        assert!(!contains_path(&doc, "llm.model"));
    }
}
