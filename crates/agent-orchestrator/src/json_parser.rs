//! Recovering JSON from chat-model output
//!
//! Even with a JSON response format requested, models wrap answers in
//! markdown fences or add a sentence before the object.

use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Parse JSON from a model reply: as-is, then without markdown fences, then
/// the outermost `{ ... }` block
pub fn extract_json<T: DeserializeOwned>(response: &str) -> Result<T, ProviderError> {
    let trimmed = response.trim();

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    let cleaned = strip_code_fences(trimmed);
    if let Ok(parsed) = serde_json::from_str::<T>(cleaned) {
        return Ok(parsed);
    }

    for candidate in [cleaned, trimmed] {
        if let Some(json_str) = find_json_object(candidate) {
            if let Ok(parsed) = serde_json::from_str::<T>(json_str) {
                return Ok(parsed);
            }
        }
    }

    Err(ProviderError::InvalidResponse(format!(
        "no JSON object in reply: {}...",
        trimmed.chars().take(200).collect::<String>()
    )))
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` and a trailing ```` ``` ````
fn strip_code_fences(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text)
        .trim();
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Outermost balanced object, ignoring braces inside string literals
fn find_json_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
