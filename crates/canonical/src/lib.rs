//! logdup canonical layer.
//!
//! Rewrites raw log lines into a canonical form so that lines differing only
//! in volatile values (request ids, timestamps, addresses, counters) collapse
//! onto the same text. Downstream stages (perceptual fingerprints, the dedup
//! engine) only ever see normalized text.
//!
//! ## What we do
//!
//! - Optional Unicode NFKC
//! - Ordered masking of volatile tokens into `<url>`, `<id>`, `<ip>`, `<ts>`
//!   and `<hex>` placeholders
//! - Optional lowercasing and whitespace collapsing
//! - Degenerate-line detection via `min_length`
//! - Content-addressed entry ids over `(text, metadata)`
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls, no locale dependence. Patterns compile once per
//! process and are shared immutably, so [`normalize`] is safe to call from any
//! thread.
//!
//! ```rust
//! use canonical::{normalize, NormalizeConfig};
//!
//! let cfg = NormalizeConfig::default();
//! let a = normalize("conn 7f3a9c21-1b2c-4d5e-8f90-a1b2c3d4e5f6 closed after 31s", &cfg);
//! let b = normalize("conn 0a1b2c3d-4e5f-4a6b-9c8d-7e6f5a4b3c2d closed after 31s", &cfg);
//! assert_eq!(a, b);
//! ```

mod config;
mod hash;
mod normalize;
mod patterns;
mod whitespace;

pub use crate::config::NormalizeConfig;
pub use crate::hash::{canonical_json, content_id, content_uuid, LOGDUP_NAMESPACE};
pub use crate::normalize::{normalize, NormalizedText};
pub use crate::whitespace::collapse_whitespace;

/// Placeholders written by the masking rules.
///
/// ```
/// use canonical::{normalize, placeholders, NormalizeConfig};
///
/// let out = normalize("peer 10.0.0.7 dropped", &NormalizeConfig::default());
/// assert_eq!(out.as_str(), format!("peer {} dropped", placeholders::IP));
/// ```
pub mod placeholders {
    pub use crate::patterns::{HEX, ID, IP, TS, URL};
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn log_token() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z]{1,10}",
            "[0-9]{1,8}",
            "[0-9a-f]{16,24}",
            "[a-zA-Z0-9]{12,20}",
            (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
                .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
            (0u32..24, 0u32..60, 0u32..60)
                .prop_map(|(h, m, s)| format!("{h:02}:{m:02}:{s:02}")),
            "(request_id|trace_id|job_id)=[a-z0-9]{6,12}",
            Just("https://example.com/a/b".to_string()),
            Just("ERROR".to_string()),
        ]
    }

    fn log_line() -> impl Strategy<Value = String> {
        let separator = proptest::sample::select(vec![" ", "  ", "\t", " | "]);
        proptest::collection::vec((log_token(), separator), 1..12)
            .prop_map(|parts| {
                parts
                    .into_iter()
                    .map(|(token, sep)| format!("{token}{sep}"))
                    .collect::<String>()
            })
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(line in log_line()) {
            let cfg = NormalizeConfig::default();
            let once = normalize(&line, &cfg);
            let twice = normalize(&once, &cfg);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalization_is_deterministic(line in log_line()) {
            let cfg = NormalizeConfig::default();
            prop_assert_eq!(normalize(&line, &cfg), normalize(&line, &cfg));
        }
    }

    #[test]
    fn uuid_variants_collapse() {
        let cfg = NormalizeConfig::default();
        let a = normalize("conn 7f3a9c21-1b2c-4d5e-8f90-a1b2c3d4e5f6 closed", &cfg);
        assert_eq!(a.as_str(), "conn <id> closed");
    }

    #[test]
    fn placeholders_are_exported() {
        assert_eq!(placeholders::ID, "<id>");
        assert_eq!(placeholders::TS, "<ts>");
    }
}
