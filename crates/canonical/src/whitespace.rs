//! Whitespace normalization.
//!
//! ```rust
//! use canonical::collapse_whitespace;
//!
//! assert_eq!(collapse_whitespace("  worker\t\tstarted \n"), "worker started");
//! ```

/// Collapse every run of Unicode whitespace into one ASCII space and trim
/// both ends. Whitespace-only input yields an empty string.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(segment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(collapse_whitespace("a \t\r\n b"), "a b");
        assert_eq!(collapse_whitespace("a\u{00A0}\u{2003}b"), "a b");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(collapse_whitespace(" \n\t "), "");
        assert_eq!(collapse_whitespace(""), "");
    }
}
