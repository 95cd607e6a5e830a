//! Tolerant decoding of model output.
//!
//! Models wrap JSON in markdown code fences often enough that the
//! fences are stripped before structured decoding. A decode failure is
//! a recoverable error, never fatal.

use serde::de::DeserializeOwned;

use jobscout_core::error::{JobscoutError, Result};

/// Remove leading/trailing markdown code fences from model output.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Decode a JSON value from model output, tolerating code fences.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| {
        JobscoutError::Decode(format!(
            "model output was not the expected JSON: {} (output: {:.200})",
            e, cleaned
        ))
    })
}
