use serde::de::DeserializeOwned;
use tracing::warn;

use common::text::truncate;

/// Strip a wrapping Markdown code fence, optionally tagged with a language
/// hint, from generated text. Text without a fence passes through trimmed.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(newline) = rest.find('\n') else {
        return "";
    };
    let inner = rest[newline + 1..].trim_end();
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

/// Parse generated text as a JSON array of `T`. Any structural failure is
/// logged and yields an empty vector; callers treat empty as "nothing
/// usable" without distinguishing parse failure from an empty response.
pub fn parse_array<T: DeserializeOwned>(raw: &str) -> Vec<T> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str(cleaned) {
        Ok(values) => values,
        Err(err) => {
            warn!(
                error = %err,
                preview = %truncate(cleaned, 160),
                "generated text is not the expected JSON shape; treating as empty"
            );
            Vec::new()
        }
    }
}
