use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use sfmcp_core::config::SalesforceConfig;
use sfmcp_core::OperationError;
use tracing::{debug, warn};

use crate::session::{password_grant, ConnectError, OrgSession};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which REST surface a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Api {
    Data,
    Tooling,
}

/// Handle on one Salesforce org. Liveness is the presence of a session; a rejected
/// token drops it so the next tool listing reflects the lost connection.
pub struct SalesforceOrg {
    config: SalesforceConfig,
    client: reqwest::Client,
    session: RwLock<Option<OrgSession>>,
}

impl SalesforceOrg {
    pub fn new(config: SalesforceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client, session: RwLock::new(None) }
    }

    /// Org already holding a session, for callers that authenticate elsewhere.
    pub fn with_session(config: SalesforceConfig, session: OrgSession) -> Self {
        let org = Self::new(config);
        org.store_session(Some(session));
        org
    }

    pub fn config(&self) -> &SalesforceConfig {
        &self.config
    }

    pub async fn connect(&self) -> Result<(), ConnectError> {
        let session = password_grant(&self.client, &self.config).await?;
        self.store_session(Some(session));
        Ok(())
    }

    pub fn disconnect(&self) {
        self.store_session(None);
    }

    pub fn connected(&self) -> bool {
        self.session.read().map(|guard| guard.is_some()).unwrap_or(false)
    }

    pub fn instance_url(&self) -> Option<String> {
        self.current_session().map(|session| session.instance_url)
    }

    fn store_session(&self, session: Option<OrgSession>) {
        if let Ok(mut guard) = self.session.write() {
            *guard = session;
        }
    }

    fn current_session(&self) -> Option<OrgSession> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }

    fn base_path(&self, api: Api) -> String {
        let version = self.config.api_version.trim_start_matches('v');
        match api {
            Api::Data => format!("/services/data/v{version}"),
            Api::Tooling => format!("/services/data/v{version}/tooling"),
        }
    }

    /// Send a request relative to the data or tooling root. `204 No Content` maps to
    /// `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        api: Api,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, OperationError> {
        let session = self.current_session().ok_or(OperationError::NotConnected)?;
        let url = format!("{}{}{}", session.instance_url, self.base_path(api), path);
        debug!(
            event_name = "salesforce.request",
            method = %method,
            url = %url,
            "salesforce request"
        );

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(session.access_token.expose_secret())
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response =
            request.send().await.map_err(|error| OperationError::Transport(error.to_string()))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!(
                event_name = "salesforce.session_expired",
                url = %url,
                "salesforce rejected session"
            );
            self.disconnect();
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OperationError::Api { status: status.as_u16(), body });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let text =
            response.text().await.map_err(|error| OperationError::Transport(error.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|error| {
            OperationError::Transport(format!("invalid JSON from Salesforce: {error}"))
        })
    }

    pub async fn get(&self, api: Api, path: &str) -> Result<Value, OperationError> {
        self.request(Method::GET, api, path, &[], None).await
    }

    pub async fn query(&self, api: Api, soql: &str) -> Result<Value, OperationError> {
        self.request(Method::GET, api, "/query", &[("q", soql)], None).await
    }

    pub async fn post(&self, api: Api, path: &str, body: &Value) -> Result<Value, OperationError> {
        self.request(Method::POST, api, path, &[], Some(body)).await
    }

    pub async fn patch(&self, api: Api, path: &str, body: &Value) -> Result<Value, OperationError> {
        self.request(Method::PATCH, api, path, &[], Some(body)).await
    }

    pub async fn delete(&self, api: Api, path: &str) -> Result<Value, OperationError> {
        self.request(Method::DELETE, api, path, &[], None).await
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use sfmcp_core::config::AppConfig;
    use sfmcp_core::OperationError;

    use super::{Api, SalesforceOrg};
    use crate::session::OrgSession;

    #[test]
    fn liveness_follows_the_session() {
        let config = AppConfig::default().salesforce;
        let org = SalesforceOrg::with_session(
            config,
            OrgSession::new("token", "https://acme.my.salesforce.com"),
        );
        assert!(org.connected());
        assert_eq!(org.instance_url().as_deref(), Some("https://acme.my.salesforce.com"));

        org.disconnect();
        assert!(!org.connected());
        assert_eq!(org.instance_url(), None);
    }

    #[test]
    fn base_paths_use_configured_version() {
        let org = SalesforceOrg::new(AppConfig::default().salesforce);
        assert_eq!(org.base_path(Api::Data), "/services/data/v59.0");
        assert_eq!(org.base_path(Api::Tooling), "/services/data/v59.0/tooling");
    }

    #[tokio::test]
    async fn requests_without_session_are_not_connected() {
        let org = SalesforceOrg::new(AppConfig::default().salesforce);
        let error = org
            .request(Method::GET, Api::Data, "/sobjects", &[], None)
            .await
            .expect_err("no session");
        assert_eq!(error, OperationError::NotConnected);
    }
}
