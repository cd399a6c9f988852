use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments for one invocation, keyed by argument name.
pub type ArgumentMapping = Map<String, Value>;

pub const TEXT_KIND: &str = "text";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub kind: String,
    pub text: String,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self { kind: TEXT_KIND.to_string(), text: text.into() }
    }

    pub fn is_text(&self) -> bool {
        self.kind == TEXT_KIND
    }
}

/// Ordered content returned by an operation handler.
///
/// `is_error` lets a handler report a failure in-band instead of returning `Err`;
/// callers treat both the same way.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub is_error: bool,
}

impl OperationResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { items: vec![ContentItem::text(text)], is_error: false }
    }

    pub fn error_text(text: impl Into<String>) -> Self {
        Self { items: vec![ContentItem::text(text)], is_error: true }
    }

    pub fn json(value: &Value) -> Self {
        let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self::text(rendered)
    }

    /// Text-kind items joined by newlines; other kinds are skipped.
    pub fn text_output(&self) -> String {
        self.items
            .iter()
            .filter(|item| item.is_text())
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
