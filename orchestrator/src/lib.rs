// orchestrator/src/lib.rs
//! The query-resolution pipeline: local price lookup first, then the text
//! model, with the model's loosely formatted output recovered into a reply.

pub mod formatter;
pub mod knowledge;
pub mod orchestrator;
pub mod prompts;
pub mod sanitizer;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use crate::formatter::{Outcome, Resolution};
pub use crate::knowledge::KnowledgeBase;
pub use crate::orchestrator::{Orchestrator, PipelineSettings};
pub use crate::prompts::PromptRules;
