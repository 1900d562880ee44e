use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizeConfig;
use crate::patterns::mask_volatile;
use crate::whitespace::collapse_whitespace;

/// Output of [`normalize`].
///
/// `degenerate` is set when the normalized text is shorter than the
/// configured `min_length`; such lines are never shingled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedText {
    pub text: String,
    pub degenerate: bool,
}

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Character count of the normalized text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl Deref for NormalizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Rewrite a raw log line into its canonical form.
///
/// Steps, in order: optional NFKC, volatile-token masking, optional
/// lowercasing, optional whitespace collapsing. The function is pure and
/// idempotent for a fixed config: `normalize(normalize(t)) == normalize(t)`.
///
/// ```rust
/// use canonical::{normalize, NormalizeConfig};
///
/// let out = normalize("User 4711 logged in from 10.1.2.3", &NormalizeConfig::default());
/// assert_eq!(out.as_str(), "user <id> logged in from <ip>");
/// assert!(!out.degenerate);
/// ```
pub fn normalize(text: &str, cfg: &NormalizeConfig) -> NormalizedText {
    let unicode: Cow<'_, str> = if cfg.normalize_unicode {
        Cow::Owned(text.nfkc().collect())
    } else {
        Cow::Borrowed(text)
    };

    let masked: Cow<'_, str> = if cfg.mask {
        Cow::Owned(mask_volatile(&unicode))
    } else {
        unicode
    };

    let cased: Cow<'_, str> = if cfg.lowercase {
        Cow::Owned(masked.to_lowercase())
    } else {
        masked
    };

    let text = if cfg.collapse_whitespace {
        collapse_whitespace(&cased)
    } else {
        cased.into_owned()
    };

    let degenerate = cfg.min_length > 0 && text.chars().count() < cfg.min_length;
    NormalizedText { text, degenerate }
}
