// orchestrator/src/test_util.rs

use async_trait::async_trait;
use krishi_core::{InferenceError, TextGenerator};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A `TextGenerator` that replays queued results and records every prompt.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, InferenceError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful completion.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    /// Queues a failure.
    pub fn fail(self, err: InferenceError) -> Self {
        self.push(Err(err))
    }

    fn push(self, result: Result<String, InferenceError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::Transport("script exhausted".to_string())))
    }
}
