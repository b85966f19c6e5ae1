// orchestrator/src/formatter.rs

use krishi_core::{InferenceError, Intent, KnowledgeEntry, ModelReply};

pub const UNPARSEABLE_MESSAGE: &str = "Maaf karein, network issue hai. Phir se boliye.";
pub const BUSY_MESSAGE: &str = "Server busy (Limit Reached). Please wait 30 seconds.";
pub const FAILURE_MESSAGE: &str = "Maaf karein, abhi jawab nahi de pa rahe. Thodi der baad phir boliye.";

/// How a query was resolved. Every outcome carries exactly one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Answered from the local price table; no model call.
    LocalPrice,
    /// Model answered and its output was recovered.
    ModelAnswer,
    /// Model answered but no reply object could be recovered.
    Unparseable,
    /// The model provider rate-limited the call.
    QuotaExceeded,
    /// Any other failure of the model call.
    DependencyFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub reply: ModelReply,
    pub outcome: Outcome,
}

pub fn local_price(entry: &KnowledgeEntry) -> Resolution {
    Resolution {
        reply: ModelReply::new(
            format!(
                "The current mandi price for {} is {}.",
                entry.keyword, entry.display_price
            ),
            Intent::Sell,
        ),
        outcome: Outcome::LocalPrice,
    }
}

pub fn model_answer(reply: ModelReply) -> Resolution {
    Resolution {
        reply,
        outcome: Outcome::ModelAnswer,
    }
}

/// Raw model text is never shown to the caller.
pub fn unparseable() -> Resolution {
    Resolution {
        reply: ModelReply::new(UNPARSEABLE_MESSAGE, Intent::Error),
        outcome: Outcome::Unparseable,
    }
}

/// `echo_errors` puts the error detail in the reply for local development.
pub fn inference_failure(err: &InferenceError, echo_errors: bool) -> Resolution {
    if err.is_quota() {
        return Resolution {
            reply: ModelReply::new(BUSY_MESSAGE, Intent::Error),
            outcome: Outcome::QuotaExceeded,
        };
    }

    let message = if echo_errors {
        format!("System Error: {}", err)
    } else {
        FAILURE_MESSAGE.to_string()
    };
    Resolution {
        reply: ModelReply::new(message, Intent::Error),
        outcome: Outcome::DependencyFailure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_price_sentence_is_templated() {
        let resolution = local_price(&KnowledgeEntry::new("onion", "2400 INR/Quintal"));
        assert_eq!(
            resolution.reply.voice_response,
            "The current mandi price for onion is 2400 INR/Quintal."
        );
        assert_eq!(resolution.reply.intent, Intent::Sell);
        assert_eq!(resolution.outcome, Outcome::LocalPrice);
    }

    #[test]
    fn quota_gets_busy_message() {
        let err = InferenceError::Transport("429 Too Many Requests".to_string());
        let resolution = inference_failure(&err, true);
        assert_eq!(resolution.outcome, Outcome::QuotaExceeded);
        assert_eq!(resolution.reply.voice_response, BUSY_MESSAGE);
        assert_eq!(resolution.reply.intent, Intent::Error);
    }

    #[test]
    fn failure_detail_only_when_echo_is_on() {
        let err = InferenceError::Transport("connection reset".to_string());

        let quiet = inference_failure(&err, false);
        assert_eq!(quiet.outcome, Outcome::DependencyFailure);
        assert_eq!(quiet.reply.voice_response, FAILURE_MESSAGE);

        let loud = inference_failure(&err, true);
        assert!(loud.reply.voice_response.starts_with("System Error: "));
        assert!(loud.reply.voice_response.contains("connection reset"));
    }

    #[test]
    fn unparseable_hides_model_text() {
        let resolution = unparseable();
        assert_eq!(resolution.outcome, Outcome::Unparseable);
        assert_eq!(resolution.reply, ModelReply::new(UNPARSEABLE_MESSAGE, Intent::Error));
    }
}
