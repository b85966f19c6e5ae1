// gemini_client/src/protocol.rs

use serde::{Deserialize, Serialize};

/// Content categories the service filters on. All of them are switched off:
/// agricultural questions about "disease", "pests" or "poison" trip the
/// default filters.
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub const BLOCK_NONE: &str = "BLOCK_NONE";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    pub contents: [Content<'a>; 1],
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Debug)]
pub struct Content<'a> {
    pub role: &'static str,
    pub parts: [Part<'a>; 1],
}

#[derive(Serialize, Debug)]
pub struct Part<'a> {
    pub text: &'a str,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

impl<'a> GenerateContentRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: BLOCK_NONE,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts joined. `None` when the service
    /// returned no text at all.
    pub fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    pub next_page_token: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == "generateContent")
    }

    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }
}
