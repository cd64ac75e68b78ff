//! Small text helpers shared by the AI and sheet layers.

/// Pull the outermost `{...}` block out of a free-text AI reply.
///
/// Code fences are ignored; the span runs from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Keep the row store from evaluating user text as a formula.
pub fn escape_cell(value: &str) -> String {
    if value.starts_with('=') {
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

/// First `n` whitespace-separated words, re-joined with single spaces.
pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Lowercase and collapse runs of whitespace.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let reply = "Claro! ```json\n{\"message_type\": \"other\", \"data\": {}}\n``` espero ter ajudado";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"message_type\": \"other\", \"data\": {}}")
        );
    }

    #[test]
    fn test_extract_json_missing() {
        assert_eq!(extract_json_object("sem json aqui"), None);
        assert_eq!(extract_json_object("} antes {"), None);
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("=SUM(A1:A3)"), "'=SUM(A1:A3)");
        assert_eq!(escape_cell("1.85"), "1.85");
        assert_eq!(escape_cell(""), "");
    }

    #[test]
    fn test_first_words() {
        assert_eq!(first_words("  Over 2.5   gols no jogo de hoje", 4), "Over 2.5 gols no");
        assert_eq!(first_words("", 4), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Real   MADRID "), "real madrid");
    }
}
