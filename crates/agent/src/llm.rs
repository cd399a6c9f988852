use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sfmcp_core::config::LlmConfig;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("model endpoint rejected the credential: {0}")]
    Unauthenticated(String),
    #[error("model endpoint request failed: {0}")]
    Transport(String),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response had no reply: {0}")]
    MissingReply(String),
}

/// Chat-completion endpoint. One call per request; callers decide what a failure means.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Pull `choices[0].message.content`; otherwise surface the endpoint's `error` value.
pub fn extract_reply(response: &Value) -> Result<String, LlmError> {
    if let Some(content) = response.pointer("/choices/0/message/content").and_then(Value::as_str)
    {
        return Ok(content.to_string());
    }

    let detail = match response.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Object(error)) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(error.clone()).to_string()),
        Some(other) if !other.is_null() => other.to_string(),
        _ => "unknown".to_string(),
    };
    Err(LlmError::MissingReply(detail))
}

/// OpenRouter-compatible chat-completions client.
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenRouterClient {
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let Some(api_key) = self.api_key.as_ref().filter(|key| !key.expose_secret().is_empty())
        else {
            return Err(LlmError::Unauthenticated(
                "no API key configured (set OPENROUTER_API_KEY)".to_string(),
            ));
        };

        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
        };
        debug!(
            event_name = "llm.request",
            model = %self.model,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .header("X-Title", "sfmcp")
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "llm.unauthenticated",
                status = status.as_u16(),
                "credential rejected"
            );
            return Err(LlmError::Unauthenticated(body));
        }

        let text = response.text().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        let payload: Value = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(LlmError::Status { status: status.as_u16(), body: text })
            }
            Err(error) => return Err(LlmError::MissingReply(format!("invalid JSON: {error}"))),
        };

        extract_reply(&payload)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sfmcp_core::config::AppConfig;

    use super::{
        extract_reply, ChatMessage, ChatRequest, CompletionBody, LlmClient, LlmError,
        OpenRouterClient,
    };

    #[test]
    fn reply_comes_from_first_choice() {
        let response = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(extract_reply(&response), Ok("hi".to_string()));
    }

    #[test]
    fn missing_choices_carry_endpoint_error() {
        assert_eq!(
            extract_reply(&json!({"error": {"message": "rate limited", "code": 429}})),
            Err(LlmError::MissingReply("rate limited".to_string()))
        );
        assert_eq!(
            extract_reply(&json!({"error": "bad model"})),
            Err(LlmError::MissingReply("bad model".to_string()))
        );
        assert_eq!(extract_reply(&json!({})), Err(LlmError::MissingReply("unknown".to_string())));
        assert_eq!(
            extract_reply(&json!({"choices": []})),
            Err(LlmError::MissingReply("unknown".to_string()))
        );
    }

    #[test]
    fn body_omits_temperature_when_unset() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hello")];
        let with = serde_json::to_value(CompletionBody {
            model: "m",
            messages: &messages,
            temperature: Some(0.3),
        })
        .expect("serialize");
        let without =
            serde_json::to_value(CompletionBody { model: "m", messages: &messages, temperature: None })
                .expect("serialize");

        assert_eq!(with["messages"][1], json!({"role": "user", "content": "hello"}));
        assert!(with.get("temperature").is_some());
        assert!(without.get("temperature").is_none());
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let mut config = AppConfig::default().llm;
        config.base_url = "https://openrouter.ai/api/v1/".to_string();
        let client = OpenRouterClient::from_config(&config);
        assert_eq!(client.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(client.model(), "openai/gpt-4.1-mini");
    }

    #[tokio::test]
    async fn missing_credential_is_an_authentication_failure() {
        let client = OpenRouterClient::from_config(&AppConfig::default().llm);
        let result = client
            .complete(ChatRequest { messages: vec![ChatMessage::user("hi")], temperature: None })
            .await;
        assert!(matches!(result, Err(LlmError::Unauthenticated(_))));
    }
}
