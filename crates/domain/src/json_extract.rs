//! Best-effort extraction of a JSON object from LLM output

use serde_json::Value;

/// Returned when no JSON object can be recovered
pub const EMPTY_OBJECT: &str = "{}";

/// Extract a JSON object from text that may be wrapped in a markdown fence or
/// surrounded by prose. Never fails: the returned string always parses as a
/// JSON object, falling back to `{}`.
pub fn extract_json(text: &str) -> String {
    // 1. fenced code block
    let unfenced = strip_code_fence(text);
    if is_json_object(unfenced) {
        return unfenced.to_string();
    }

    // 2. first '{' to last '}' of the original text
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            let sliced = &text[start..=end];
            if is_json_object(sliced) {
                return sliced.to_string();
            }
        }
    }

    // 3. trim stray characters around the unfenced candidate
    let trimmed = unfenced
        .trim_start_matches(|c| c != '{')
        .trim_end_matches(|c| c != '}');
    if is_json_object(trimmed) {
        return trimmed.to_string();
    }

    EMPTY_OBJECT.to_string()
}

fn is_json_object(candidate: &str) -> bool {
    matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_)))
}

/// Strip a single ```/```json fenced block, returning its body, or the trimmed
/// input when there is no fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];

    // Skip the language tag line, if any
    let body_start = match after_open.find('\n') {
        Some(newline) if !after_open[..newline].trim_start().starts_with('{') => newline + 1,
        _ => 0,
    };
    let body = &after_open[body_start..];

    match body.rfind("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}
