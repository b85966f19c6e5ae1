// orchestrator/src/sanitizer.rs
//! Best-effort recovery of the JSON object a model was asked to return.
//!
//! Models wrap the object in Markdown fences or chat around it despite being
//! told not to. The object is taken to be everything from the first `{` to the
//! last `}` once fence markers are removed. Braces in the surrounding prose
//! defeat this; that case is reported as unparseable, not repaired.

use krishi_core::ModelReply;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Unparseable {
    #[error("model output contains no JSON object")]
    NoObject,
    #[error("model output object is not a valid reply: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Removes literal "```json" and "```" markers anywhere in the text.
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "")
}

/// Slice from the first `{` to the last `}` of the fence-stripped text.
pub fn extract_json_object(raw: &str) -> Result<String, Unparseable> {
    let clean = strip_fences(raw);
    match (clean.find('{'), clean.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(clean[start..=end].to_string()),
        _ => Err(Unparseable::NoObject),
    }
}

/// Recovers a [`ModelReply`] from raw model output.
pub fn parse_model_reply(raw: &str) -> Result<ModelReply, Unparseable> {
    let object = extract_json_object(raw)?;
    Ok(serde_json::from_str(&object)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_core::Intent;

    #[test]
    fn fenced_output_is_unwrapped() {
        let raw = "```json\n{\"voiceResponse\":\"x\",\"intent\":\"GENERAL\"}\n```";
        let reply = parse_model_reply(raw).unwrap();
        assert_eq!(reply, ModelReply::new("x", Intent::General));
    }

    #[test]
    fn surrounding_prose_is_dropped() {
        let raw = "Sure! {\"voiceResponse\":\"ok\",\"intent\":\"GENERAL\"} Hope that helps.";
        let reply = parse_model_reply(raw).unwrap();
        assert_eq!(reply, ModelReply::new("ok", Intent::General));
    }

    #[test]
    fn nested_objects_survive_first_last_slicing() {
        let raw = r#"{"voiceResponse":"Pyaz 24 rupaye kilo","intent":"SELL","extra":{"kg":24}}"#;
        let reply = parse_model_reply(raw).unwrap();
        assert_eq!(reply.voice_response, "Pyaz 24 rupaye kilo");
        assert_eq!(reply.intent, Intent::Sell);
    }

    #[test]
    fn null_intent_keeps_the_answer() {
        let reply = parse_model_reply(r#"{"voiceResponse":"ok","intent":null}"#).unwrap();
        assert_eq!(reply, ModelReply::new("ok", Intent::General));
    }

    #[test]
    fn no_braces_is_unparseable() {
        assert!(matches!(
            parse_model_reply("I am not able to help with that."),
            Err(Unparseable::NoObject)
        ));
        assert!(matches!(parse_model_reply("only { opening"), Err(Unparseable::NoObject)));
        assert!(matches!(parse_model_reply("} backwards {"), Err(Unparseable::NoObject)));
    }

    #[test]
    fn stray_brace_in_prose_is_unparseable() {
        let raw = r#"{"voiceResponse":"ok","intent":"GENERAL"} then a stray } brace"#;
        assert!(matches!(parse_model_reply(raw), Err(Unparseable::InvalidJson(_))));
    }

    #[test]
    fn object_without_voice_response_is_unparseable() {
        assert!(matches!(
            parse_model_reply(r#"{"intent":"WEATHER"}"#),
            Err(Unparseable::InvalidJson(_))
        ));
    }

    #[test]
    fn extract_returns_exact_slice() {
        assert_eq!(
            extract_json_object("```\nnoise {\"a\":1} tail\n```").unwrap(),
            "{\"a\":1}"
        );
    }
}
