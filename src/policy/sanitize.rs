//! Input hygiene applied before classification.
//!
//! Strips invisible Unicode and control characters and caps length at a word
//! boundary. Runs on every user message before any rule evaluation.

/// Clean a raw user message.
pub fn sanitize_input(raw: &str, max_chars: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !is_invisible(*c))
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.chars().count() > max_chars {
        tracing::debug!(max_chars, "Truncating oversized input");
        truncate_at_word_boundary(cleaned, max_chars)
    } else {
        cleaned.to_string()
    }
}

/// Zero-width and direction-control characters that have no business in a
/// typed symptom description.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
            | '\u{00AD}'
    )
}

fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => truncated[..idx].trim_end().to_string(),
        _ => truncated,
    }
}
