//! Input sanitization.

/// HTML-escape a string for safe output.
///
/// Escapes the five markup-significant characters, ampersand first so
/// existing entities are not double-counted.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Trim surrounding whitespace and escape markup.
pub fn sanitize_input(raw: &str) -> String {
    escape_html(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_special_chars() {
        assert_eq!(
            escape_html("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#039;xss&#039;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_escape_ampersand() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_html(r#"say "hello""#), "say &quot;hello&quot;");
    }

    #[test]
    fn test_sanitize_trims() {
        assert_eq!(sanitize_input("  Ann \t\n"), "Ann");
        assert_eq!(sanitize_input("   "), "");
    }

    #[test]
    fn test_sanitize_plain_text() {
        assert_eq!(sanitize_input("hello world"), "hello world");
    }
}
