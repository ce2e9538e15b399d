//! Identifier safety helpers.

/// PostgreSQL truncates identifiers longer than this.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Wraps an identifier in double quotes, doubling any embedded quote.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Checks that `ident` is a plain identifier: a letter or underscore
/// followed by letters, digits or underscores, at most 63 bytes.
pub fn is_valid_identifier(ident: &str) -> bool {
    if ident.is_empty() || ident.len() > MAX_IDENTIFIER_LENGTH {
        return false;
    }
    let mut chars = ident.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(
            quote_identifier("x\"; DROP TABLE users; --"),
            "\"x\"\"; DROP TABLE users; --\""
        );
    }

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("users"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("created_at2"));
        assert!(is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("user name"));
        assert!(!is_valid_identifier("users;--"));
        assert!(!is_valid_identifier("naïve"));
        assert!(!is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)));
    }
}
