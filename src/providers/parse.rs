//! Strict JSON decoding for model responses.
//!
//! Models frequently wrap structured output in a markdown code fence.
//! Decoding strips one fence layer (if present) and hands the remainder
//! straight to serde. There is deliberately no repair chain: a response
//! that fails the strict decode is reported as a parse error, and the
//! caller decides whether to re-prompt once with a stricter instruction.

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Removes a single surrounding markdown code fence, if present.
///
/// Handles both ```json and bare ``` fences. Content without a fence is
/// returned trimmed and otherwise untouched.
pub fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();

    // Unwrap ```json ... ``` or ``` ... ```; anything else passes through.
    let re = match Regex::new(r"^```(?:json)?\s*\n?([\s\S]*?)\n?```$") {
        Ok(re) => re,
        Err(_) => return trimmed.to_string(),
    };

    if let Some(caps) = re.captures(trimmed) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str().trim().to_string();
        }
    }

    trimmed.to_string()
}

/// Decodes a model response into `T` after stripping a code fence.
///
/// Any decode failure maps to [`ProviderError::Parse`] with a short
/// preview of the offending content so the failure is diagnosable from
/// logs without dumping the full response.
pub fn decode_response<T: DeserializeOwned>(content: &str) -> Result<T, ProviderError> {
    let json = strip_code_fence(content);

    serde_json::from_str(&json).map_err(|e| {
        let preview: String = json.chars().take(120).collect();
        ProviderError::Parse(format!("{} (content starts with: '{}')", e, preview))
    })
}
