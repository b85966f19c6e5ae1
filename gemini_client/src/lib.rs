// gemini_client/src/lib.rs
//! Client for Google's hosted Gemini text models.

pub mod protocol;

use async_trait::async_trait;
use krishi_config::GeminiSettings;
use krishi_core::{InferenceError, TextGenerator};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::protocol::{GenerateContentRequest, GenerateContentResponse, ListModelsResponse};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self, InferenceError> {
        if settings.api_key.trim().is_empty() {
            return Err(InferenceError::MissingCredential);
        }
        info!("[Gemini] Initializing client for model '{}'", settings.model);
        Ok(Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Names of the models this key may call `generateContent` on, without the
    /// `models/` prefix.
    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/models", self.base_url))
                .header(API_KEY_HEADER, &self.api_key);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await.map_err(transport_error)?;
            let listing: ListModelsResponse = read_json(response).await?;
            names.extend(
                listing
                    .models
                    .iter()
                    .filter(|model| model.supports_generate_content())
                    .map(|model| model.short_name().to_string()),
            );

            match listing.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("[Gemini] {} models support generateContent", names.len());
        Ok(names)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        debug!("[Gemini] Sending prompt of {} chars", prompt.chars().count());
        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateContentRequest::new(prompt))
            .send()
            .await
            .map_err(transport_error)?;

        let body: GenerateContentResponse = read_json(response).await?;
        if let Some(reason) = body
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            warn!("[Gemini] Prompt blocked by the service: {}", reason);
        }

        let finish_reason = body
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.clone());
        body.into_text().ok_or_else(|| {
            warn!(
                "[Gemini] Empty completion (finish reason: {})",
                finish_reason.as_deref().unwrap_or("none")
            );
            InferenceError::EmptyCompletion
        })
    }
}

async fn read_json<T>(response: reqwest::Response) -> Result<T, InferenceError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        warn!("[Gemini] Service returned {}: {}", status, text);
        return Err(status_error(status, text));
    }

    serde_json::from_str(&text).map_err(|e| InferenceError::Api {
        status: status.as_u16(),
        body: format!("unreadable response body ({}): {}", e, text),
    })
}

fn status_error(status: StatusCode, body: String) -> InferenceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        InferenceError::QuotaExceeded(body)
    } else {
        InferenceError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

fn transport_error(err: reqwest::Error) -> InferenceError {
    InferenceError::Transport(err.to_string())
}
