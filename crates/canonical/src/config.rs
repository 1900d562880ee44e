//! Configuration types for log line normalization.
//!
//! [`NormalizeConfig`] controls which transforms run over a raw log line
//! before it is shingled. The flags are part of the fingerprint contract: two
//! fingerprints are only comparable when they were produced with the same
//! normalization flags.
//!
//! # Examples
//!
//! ```rust
//! use canonical::NormalizeConfig;
//!
//! let config = NormalizeConfig::default();
//! assert!(config.mask);
//! assert!(config.lowercase);
//! assert!(config.collapse_whitespace);
//! assert_eq!(config.min_length, 0);
//! ```

use serde::{Deserialize, Serialize};

/// Flags for the log line normalizer.
///
/// Serialized form (YAML or JSON):
///
/// ```json
/// {
///   "mask": true,
///   "lowercase": true,
///   "collapse_whitespace": true,
///   "normalize_unicode": false,
///   "min_length": 0
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Replace volatile tokens (ids, timestamps, addresses, numbers) with
    /// fixed placeholders such as `<id>` or `<ts>`.
    pub mask: bool,
    /// Lowercase the text after masking.
    pub lowercase: bool,
    /// Collapse whitespace runs to a single ASCII space and trim both ends.
    pub collapse_whitespace: bool,
    /// Apply Unicode NFKC before masking so full-width digits and letters are
    /// caught by the ASCII patterns.
    pub normalize_unicode: bool,
    /// Normalized lines shorter than this many characters are flagged as
    /// degenerate and never shingled. `0` disables the check.
    pub min_length: usize,
}

impl NormalizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mask(mut self, mask: bool) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_collapse_whitespace(mut self, collapse: bool) -> Self {
        self.collapse_whitespace = collapse;
        self
    }

    pub fn with_normalize_unicode(mut self, normalize_unicode: bool) -> Self {
        self.normalize_unicode = normalize_unicode;
        self
    }

    /// Set the degenerate-line threshold (in characters).
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            mask: true,
            lowercase: true,
            collapse_whitespace: true,
            normalize_unicode: false,
            min_length: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain_sets_every_flag() {
        let cfg = NormalizeConfig::new()
            .with_mask(false)
            .with_lowercase(false)
            .with_collapse_whitespace(false)
            .with_normalize_unicode(true)
            .with_min_length(12);

        assert!(!cfg.mask);
        assert!(!cfg.lowercase);
        assert!(!cfg.collapse_whitespace);
        assert!(cfg.normalize_unicode);
        assert_eq!(cfg.min_length, 12);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: NormalizeConfig = serde_json::from_str(r#"{"lowercase": false}"#).unwrap();
        assert!(!cfg.lowercase);
        assert!(cfg.mask);
        assert!(cfg.collapse_whitespace);
        assert_eq!(cfg.min_length, 0);
    }
}
