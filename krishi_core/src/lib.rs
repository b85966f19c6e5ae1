// krishi_core/src/lib.rs
//! Types shared by every crate of the assistant: the request coming in, the
//! reply going out, the price table entries and the seam to the text model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Who is talking to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Farmer,
    Buyer,
}

impl UserType {
    /// Lenient parse used for client payloads; unknown labels become `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "farmer" => Some(UserType::Farmer),
            "buyer" => Some(UserType::Buyer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Farmer => "farmer",
            UserType::Buyer => "buyer",
        }
    }
}

/// One incoming query. Built per request and dropped once the reply is out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub raw_text: String,
    pub user_type: Option<UserType>,
    pub target_language: Option<String>,
}

impl QueryRequest {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    pub fn with_user_type(mut self, user_type: UserType) -> Self {
        self.user_type = Some(user_type);
        self
    }
}

/// Coarse classification attached to every reply.
///
/// Labels outside the known set are kept as `Other` so a model reply is passed
/// through without being rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    Sell,
    Transport,
    Doctor,
    Weather,
    General,
    Error,
    Other(String),
}

impl Intent {
    pub fn as_str(&self) -> &str {
        match self {
            Intent::Sell => "SELL",
            Intent::Transport => "TRANSPORT",
            Intent::Doctor => "DOCTOR",
            Intent::Weather => "WEATHER",
            Intent::General => "GENERAL",
            Intent::Error => "ERROR",
            Intent::Other(label) => label,
        }
    }
}

impl Default for Intent {
    fn default() -> Self {
        Intent::General
    }
}

impl From<String> for Intent {
    fn from(label: String) -> Self {
        match label.trim().to_uppercase().as_str() {
            "SELL" => Intent::Sell,
            "TRANSPORT" => Intent::Transport,
            "DOCTOR" => Intent::Doctor,
            "WEATHER" => Intent::Weather,
            "GENERAL" => Intent::General,
            "ERROR" => Intent::Error,
            _ => Intent::Other(label),
        }
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single unit returned across the system boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReply {
    pub voice_response: String,
    #[serde(default, deserialize_with = "intent_or_general")]
    pub intent: Intent,
}

/// A `null` intent reads the same as a missing one.
fn intent_or_general<'de, D>(deserializer: D) -> Result<Intent, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    Ok(label.map(Intent::from).unwrap_or_default())
}

impl ModelReply {
    pub fn new(voice_response: impl Into<String>, intent: Intent) -> Self {
        Self {
            voice_response: voice_response.into(),
            intent,
        }
    }
}

/// A price table row: a crop name or regional alias and the price to speak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    pub keyword: String,
    pub display_price: String,
}

impl KnowledgeEntry {
    /// Keywords are stored normalized so they compare against normalized input.
    pub fn new(keyword: &str, display_price: impl Into<String>) -> Self {
        Self {
            keyword: keyword.trim().to_lowercase(),
            display_price: display_price.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference credential is missing")]
    MissingCredential,
    #[error("inference quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("inference service returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("inference transport failed: {0}")]
    Transport(String),
    #[error("inference service returned an empty completion")]
    EmptyCompletion,
}

impl InferenceError {
    /// Rate-limit failures are reported to the user differently from other
    /// failures. Some surface only through the error text.
    pub fn is_quota(&self) -> bool {
        match self {
            InferenceError::QuotaExceeded(_) => true,
            InferenceError::Api { status: 429, .. } => true,
            other => looks_like_quota(&other.to_string()),
        }
    }
}

/// Known rate-limit signatures in error text from the model provider.
pub fn looks_like_quota(message: &str) -> bool {
    message.contains("429")
        || message.contains("Quota")
        || message.contains("quota")
        || message.contains("RESOURCE_EXHAUSTED")
}

/// The external text model. Everything that talks to a hosted model goes
/// through this trait so the pipeline can be driven by a scripted stand-in.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// One blocking completion: prompt in, raw text out.
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_round_trips_known_and_unknown_labels() {
        let reply: ModelReply =
            serde_json::from_str(r#"{"voiceResponse":"ok","intent":"doctor"}"#).unwrap();
        assert_eq!(reply.intent, Intent::Doctor);

        let reply: ModelReply =
            serde_json::from_str(r#"{"voiceResponse":"ok","intent":"SELL/PRICE"}"#).unwrap();
        assert_eq!(reply.intent, Intent::Other("SELL/PRICE".to_string()));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["intent"], "SELL/PRICE");
    }

    #[test]
    fn missing_intent_defaults_to_general() {
        let reply: ModelReply = serde_json::from_str(r#"{"voiceResponse":"namaste"}"#).unwrap();
        assert_eq!(reply.intent, Intent::General);

        let reply: ModelReply =
            serde_json::from_str(r#"{"voiceResponse":"namaste","intent":null}"#).unwrap();
        assert_eq!(reply.intent, Intent::General);
    }

    #[test]
    fn reply_serializes_in_wire_shape() {
        let reply = ModelReply::new("x", Intent::Error);
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, serde_json::json!({"voiceResponse": "x", "intent": "ERROR"}));
    }

    #[test]
    fn user_type_parse_is_lenient() {
        assert_eq!(UserType::parse(" Farmer "), Some(UserType::Farmer));
        assert_eq!(UserType::parse("BUYER"), Some(UserType::Buyer));
        assert_eq!(UserType::parse("trader"), None);
    }

    #[test]
    fn quota_detection_uses_status_and_text() {
        assert!(InferenceError::Api { status: 429, body: String::new() }.is_quota());
        assert!(InferenceError::Transport("You exceeded your current Quota".into()).is_quota());
        assert!(InferenceError::Api {
            status: 400,
            body: "{\"status\":\"RESOURCE_EXHAUSTED\"}".into()
        }
        .is_quota());
        assert!(!InferenceError::Transport("connection reset".into()).is_quota());
        assert!(!InferenceError::EmptyCompletion.is_quota());
    }

    #[test]
    fn knowledge_entry_normalizes_keyword() {
        let entry = KnowledgeEntry::new("  Onion ", "2400 INR/Quintal");
        assert_eq!(entry.keyword, "onion");
    }
}
