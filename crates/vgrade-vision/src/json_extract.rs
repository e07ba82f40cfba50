//! Extract a JSON payload from possibly-fenced model output.
//!
//! Generative models routinely wrap the JSON they were asked for in
//! markdown code fences, with or without a language tag. This is the one
//! place that cleanup lives; call sites never trim fences themselves.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// How much of the offending text an error may carry. Bounds log size;
/// the full payload is never attached.
const SNIPPET_CHARS: usize = 100;

/// The cleaned text was not the expected JSON shape.
#[derive(Debug, Error)]
#[error("no valid JSON object in model response (starts with: {snippet:?})")]
pub struct JsonExtractError {
    pub snippet: String,
}

impl JsonExtractError {
    fn new(text: &str) -> Self {
        Self {
            snippet: text.chars().take(SNIPPET_CHARS).collect(),
        }
    }
}

/// Strip leading/trailing markdown code fences and an optional language
/// tag, returning the inner text.
pub fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the rest of the fence line ("json", "JSON", or nothing).
        text = match rest.split_once('\n') {
            Some((_tag, body)) => body,
            None => rest,
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Parse a typed value out of possibly-fenced model output.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, JsonExtractError> {
    let cleaned = strip_fences(text);
    serde_json::from_str(cleaned).map_err(|_| JsonExtractError::new(cleaned))
}
