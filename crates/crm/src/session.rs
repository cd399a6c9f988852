use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sfmcp_core::config::SalesforceConfig;
use thiserror::Error;
use tracing::{error, info};

const DEFAULT_CLIENT_ID: &str = "sfmcp";

/// Authenticated org session: bearer token plus the instance the token is valid for.
#[derive(Clone, Debug)]
pub struct OrgSession {
    pub access_token: SecretString,
    pub instance_url: String,
}

impl OrgSession {
    pub fn new(access_token: impl Into<String>, instance_url: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("salesforce username and password are not configured")]
    MissingCredentials,
    #[error("salesforce token request failed: {0}")]
    Transport(String),
    #[error("salesforce token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("salesforce token response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    instance_url: String,
}

pub fn token_url(login_url: &str) -> String {
    format!("{}/services/oauth2/token", login_url.trim_end_matches('/'))
}

/// Username-password OAuth flow; the security token is appended to the password.
pub async fn password_grant(
    client: &reqwest::Client,
    config: &SalesforceConfig,
) -> Result<OrgSession, ConnectError> {
    let (Some(username), Some(password)) = (config.username.as_deref(), config.password.as_ref())
    else {
        return Err(ConnectError::MissingCredentials);
    };

    let mut secret = password.expose_secret().to_string();
    if let Some(token) = &config.security_token {
        secret.push_str(token.expose_secret());
    }
    let client_id = config.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID);
    let client_secret = config.client_secret.as_ref().map(|value| value.expose_secret());

    let mut form = vec![
        ("grant_type", "password"),
        ("client_id", client_id),
        ("username", username),
        ("password", secret.as_str()),
    ];
    if let Some(client_secret) = client_secret {
        form.push(("client_secret", client_secret));
    }

    let url = token_url(&config.login_url);
    let response = client.post(&url).form(&form).send().await.map_err(|source| {
        error!(
            event_name = "salesforce.token_request_failed",
            error = %source,
            "token request failed"
        );
        ConnectError::Transport(source.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ConnectError::Rejected { status: status.as_u16(), body });
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|source| ConnectError::InvalidResponse(source.to_string()))?;
    if token.access_token.is_empty() || token.instance_url.is_empty() {
        return Err(ConnectError::InvalidResponse(
            "missing access_token or instance_url".to_string(),
        ));
    }

    info!(
        event_name = "salesforce.session_established",
        instance_url = %token.instance_url,
        "salesforce session established"
    );
    Ok(OrgSession::new(token.access_token, token.instance_url))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use sfmcp_core::config::AppConfig;

    use super::{password_grant, token_url, ConnectError, OrgSession};

    #[test]
    fn token_url_tolerates_trailing_slash() {
        assert_eq!(
            token_url("https://login.salesforce.com/"),
            "https://login.salesforce.com/services/oauth2/token"
        );
    }

    #[test]
    fn session_normalizes_instance_url() {
        let session = OrgSession::new("token", "https://acme.my.salesforce.com/");
        assert_eq!(session.instance_url, "https://acme.my.salesforce.com");
        assert_eq!(session.access_token.expose_secret(), "token");
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let config = AppConfig::default();
        let result = password_grant(&reqwest::Client::new(), &config.salesforce).await;
        assert!(matches!(result, Err(ConnectError::MissingCredentials)));
    }
}
