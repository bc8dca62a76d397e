//! Parsing model output into typed structures
//!
//! Models in JSON mode still occasionally wrap the payload in markdown fences
//! or add stray text around it. We try a few deterministic salvage candidates
//! before giving up; a payload that doesn't fit the type is a protocol error.

use crate::error::{LqaError, LqaResult};

/// Maximum length for model content echoed in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Sanitize response content for error messages to prevent credential leakage.
pub(crate) fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-",
    ];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated.to_string()
}

/// Truncate a string for display (Unicode-safe)
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

fn push_unique_candidate(candidates: &mut Vec<String>, candidate: impl Into<String>) {
    let candidate = candidate.into();
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return;
    }
    if !candidates.iter().any(|existing| existing == trimmed) {
        candidates.push(trimmed.to_string());
    }
}

/// Remove a surrounding ```json ... ``` fence, if any.
pub fn strip_markdown_fences(content: &str) -> Option<String> {
    let trimmed = content.trim();
    let without_open = trimmed.strip_prefix("```")?;
    let after_header = match without_open.find('\n') {
        Some(newline_idx) => &without_open[newline_idx + 1..],
        None => without_open,
    };
    let end_idx = after_header.rfind("```")?;
    Some(after_header[..end_idx].trim().to_string())
}

/// First balanced `{...}` starting at `start`, string-literal aware.
fn extract_balanced_object(content: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&content[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse model content as `T`, tolerating fences and surrounding chatter.
pub fn parse_structured_content<T>(content: &str) -> LqaResult<T>
where
    T: serde::de::DeserializeOwned,
{
    if content.trim().is_empty() {
        return Err(LqaError::protocol("model returned an empty response"));
    }

    let mut candidates = Vec::new();
    if let Some(stripped) = strip_markdown_fences(content) {
        push_unique_candidate(&mut candidates, stripped);
    }
    push_unique_candidate(&mut candidates, content);
    if let Some(start) = content.find('{') {
        if let Some(object) = extract_balanced_object(content, start) {
            push_unique_candidate(&mut candidates, object);
        }
    }

    let mut last_err: Option<String> = None;
    for candidate in candidates {
        match serde_json::from_str::<T>(&candidate) {
            Ok(data) => return Ok(data),
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    Err(LqaError::protocol(format!(
        "failed to parse structured response: {} (content: {})",
        last_err.unwrap_or_else(|| "unknown parse error".to_string()),
        sanitize_api_response(content)
    )))
}
