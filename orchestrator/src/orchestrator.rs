// orchestrator/src/orchestrator.rs

use crate::formatter::{self, Resolution};
use crate::knowledge::{normalize, KnowledgeBase};
use crate::prompts::{build_query_prompt, translation_prompt, PromptRules};
use crate::sanitizer::parse_model_reply;
use krishi_core::{InferenceError, QueryRequest, TextGenerator};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Used when a request does not name a reply language.
    pub default_language: String,
    /// Put dependency error detail in replies (local development).
    pub echo_errors: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            echo_errors: false,
        }
    }
}

/// Query-resolution pipeline.
///
/// Answers from the price table when a known keyword appears in the input,
/// otherwise asks the text model. Holds only read-only state, so one instance
/// is shared by every request.
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    knowledge: KnowledgeBase,
    rules: PromptRules,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        knowledge: KnowledgeBase,
        rules: PromptRules,
        settings: PipelineSettings,
    ) -> Self {
        info!(
            "[Orchestrator] Ready with {} price entries, {} rules, generator '{}'",
            knowledge.len(),
            rules.rules.len(),
            generator.name()
        );
        Self {
            generator,
            knowledge,
            rules,
            settings,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Resolves one query into exactly one reply. Never fails: model errors
    /// become apology replies tagged with their outcome.
    pub async fn resolve(&self, request: &QueryRequest) -> Resolution {
        let normalized = normalize(&request.raw_text);

        if let Some(entry) = self.knowledge.lookup(&normalized) {
            info!("[Orchestrator] Local price hit for '{}'", entry.keyword);
            return formatter::local_price(entry);
        }

        let language = self.language_for(request);
        let prompt = build_query_prompt(request, language, &self.rules, &self.knowledge);
        debug!(
            "[Orchestrator] No local match; forwarding to '{}' in '{}'",
            self.generator.name(),
            language
        );

        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                error!("[Orchestrator] Inference failed: {}", err);
                return formatter::inference_failure(&err, self.settings.echo_errors);
            }
        };

        match parse_model_reply(&raw) {
            Ok(reply) => {
                info!("[Orchestrator] Model answered with intent {}", reply.intent);
                formatter::model_answer(reply)
            }
            Err(reason) => {
                warn!("[Orchestrator] {}. Raw output: {}", reason, raw);
                formatter::unparseable()
            }
        }
    }

    /// Translates `text` into `target_language`, returning the trimmed model
    /// output.
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, InferenceError> {
        let prompt = translation_prompt(text, target_language);
        let translated = self.generator.generate(&prompt).await?;
        Ok(translated.trim().to_string())
    }

    fn language_for<'a>(&'a self, request: &'a QueryRequest) -> &'a str {
        request
            .target_language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .unwrap_or(self.settings.default_language.as_str())
    }
}
