// Shared prompt constants and prompt-building utilities.
// Each service that needs oracle calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Marker appended to any field cut short by `truncate_chars`.
pub const TRUNCATION_MARKER: &str = " [truncated]";

/// Truncates `text` to at most `max_chars` characters (not bytes), appending
/// `TRUNCATION_MARKER` when anything was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", text[..byte_idx].trim_end()),
        None => text.to_string(),
    }
}

/// Joins at most `max_items` entries with ", ", noting how many were left out.
pub fn join_bounded(items: &[String], max_items: usize) -> String {
    let shown = items
        .iter()
        .take(max_items)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > max_items {
        format!("{shown} (+{} more)", items.len() - max_items)
    } else {
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(truncate_chars("Rust", 10), "Rust");
    }

    #[test]
    fn test_long_text_is_cut_on_char_boundary() {
        let text = "Résumé ".repeat(10);
        let cut = truncate_chars(&text, 8);
        assert!(cut.starts_with("Résumé R"));
        assert!(cut.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_join_bounded_reports_overflow() {
        let items: Vec<String> = ["Rust", "Go", "SQL"].iter().map(|s| s.to_string()).collect();
        assert_eq!(join_bounded(&items, 2), "Rust, Go (+1 more)");
        assert_eq!(join_bounded(&items, 5), "Rust, Go, SQL");
    }
}
