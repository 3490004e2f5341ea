//! Bounded excerpts of document content around a query match.

const ELLIPSIS: &str = "...";

/// Build a snippet of at most `max_chars` characters (plus ellipses).
///
/// The window is centred on the earliest case-insensitive occurrence of any
/// term. With no occurrence the head of the content is used.
pub fn extract_snippet(content: &str, terms: &[String], max_chars: usize) -> String {
    let text = collapse_whitespace(content);
    if text.is_empty() || max_chars == 0 {
        return String::new();
    }

    // ASCII lowercasing keeps byte offsets aligned with `text`
    let haystack = text.to_ascii_lowercase();
    let anchor = terms
        .iter()
        .map(|t| t.to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .filter_map(|t| haystack.find(&t))
        .min();

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total <= max_chars {
        return text;
    }

    let (start, end) = match anchor {
        Some(byte_pos) => {
            let center = text[..byte_pos].chars().count();
            let end = (center.saturating_sub(max_chars / 2) + max_chars).min(total);
            (end.saturating_sub(max_chars), end)
        }
        None => (0, max_chars),
    };

    let mut snippet = String::with_capacity(max_chars + 2 * ELLIPSIS.len());
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&chars[start..end]);
    if end < total {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_short_content_is_returned_whole() {
        let snippet = extract_snippet(
            "# Authentication\n\nHandle user login and JWT tokens.",
            &terms(&["authentication"]),
            160,
        );
        assert_eq!(snippet, "# Authentication Handle user login and JWT tokens.");
    }

    #[test]
    fn test_window_centres_on_match() {
        let content = format!("{} needle {}", "a ".repeat(200), "b ".repeat(200));
        let snippet = extract_snippet(&content, &terms(&["NEEDLE"]), 40);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("needle"));
        assert_eq!(snippet.chars().count(), 40 + 6);
    }

    #[test]
    fn test_head_fallback() {
        let content = "word ".repeat(100);
        let snippet = extract_snippet(&content, &terms(&["missing"]), 20);
        assert!(!snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 23);
    }

    #[test]
    fn test_match_near_end_keeps_full_window() {
        let content = format!("{}tail", "x ".repeat(100));
        let snippet = extract_snippet(&content, &terms(&["tail"]), 30);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("tail"));
        assert_eq!(snippet.chars().count(), 33);
    }

    #[test]
    fn test_multibyte_content() {
        let content = format!("{} café login {}", "é ".repeat(100), "ü ".repeat(100));
        let snippet = extract_snippet(&content, &terms(&["login"]), 20);
        assert!(snippet.contains("login"));
    }
}
