//! Lenient parsing of free-text oracle replies.
//!
//! Nothing about the reply shape is guaranteed: JSON may be fenced, wrapped
//! in prose, carry trailing commas, or be cut off mid-object.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"))
}

fn integer_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,3}\b").expect("integer token pattern is valid"))
}

/// First standalone integer token in `text` that lies in `0..=max`.
/// "Score: 85/100" gives 85; "1000" and "250" are skipped.
pub fn first_integer_in_range(text: &str, max: u8) -> Option<u8> {
    integer_token_re()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<u16>().ok())
        .find(|n| *n <= u16::from(max))
        .and_then(|n| u8::try_from(n).ok())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Parses the first JSON object found in `text` into `T`.
///
/// Tries, in order: the whole (unfenced) reply, the brace-matched object
/// starting at the first `{`, and the span from the first `{` to the last `}`.
/// Each candidate is retried with trailing commas removed.
pub fn parse_json_lenient<T: DeserializeOwned>(text: &str) -> Option<T> {
    let text = strip_json_fences(text);

    let mut candidates = vec![text];
    if let Some(object) = balanced_object(text) {
        candidates.push(object);
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            candidates.push(&text[start..=end]);
        }
    }

    candidates.into_iter().find_map(|candidate| {
        serde_json::from_str(candidate).ok().or_else(|| {
            let repaired = trailing_comma_re().replace_all(candidate, "$1");
            serde_json::from_str(&repaired).ok()
        })
    })
}

/// Returns the slice from the first `{` to its matching `}`, honouring
/// string literals and escapes. `None` if the object is never closed.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
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
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
