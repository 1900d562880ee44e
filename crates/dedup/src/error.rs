use filter::FilterError;
use index::IndexError;
use perceptual::{FingerprintError, MetricError};
use thiserror::Error;

/// The three failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad construction parameters, or a request for a filter feature this
    /// build does not implement (see [`DedupError::is_unsupported`]). Fatal:
    /// retrying the same call cannot succeed.
    Configuration,
    /// Malformed caller input; the offending spec or entry is attached.
    Validation,
    /// A store call failed. Propagated as-is, never retried here.
    Upstream,
}

#[derive(Debug, Error)]
pub enum DedupError {
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error("invalid dedup config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("invalid entry #{index} ({id}): {reason}")]
    InvalidEntry {
        index: usize,
        id: String,
        reason: String,
    },

    #[error("entry #{index} has malformed timestamp {value:?} in `{field}`")]
    InvalidTimestamp {
        index: usize,
        field: String,
        value: String,
    },

    #[error("refusing to act on an empty filter")]
    EmptyFilter,

    #[error("store error: {0}")]
    Store(#[from] IndexError),
}

impl DedupError {
    /// `FilterError::NotImplemented` (e.g. `or` mode over an atomic list)
    /// reports [`ErrorKind::Configuration`]: the spec is well formed but asks
    /// for something this build cannot do.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DedupError::Fingerprint(_) | DedupError::InvalidConfig(_) => ErrorKind::Configuration,
            DedupError::Filter(err) | DedupError::Store(IndexError::Filter(err)) => {
                if err.is_validation() {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Configuration
                }
            }
            DedupError::Metric(_)
            | DedupError::InvalidEntry { .. }
            | DedupError::InvalidTimestamp { .. }
            | DedupError::EmptyFilter => ErrorKind::Validation,
            DedupError::Store(_) => ErrorKind::Upstream,
        }
    }

    /// True when the request named a feature that is not implemented.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            DedupError::Filter(FilterError::NotImplemented { .. })
                | DedupError::Store(IndexError::Filter(FilterError::NotImplemented { .. }))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_source() {
        let cfg = DedupError::from(FingerprintError::BandsDoNotDivide {
            num_hashes: 100,
            bands: 7,
        });
        assert_eq!(cfg.kind(), ErrorKind::Configuration);

        let metric = DedupError::from(MetricError::LengthMismatch { left: 1, right: 2 });
        assert_eq!(metric.kind(), ErrorKind::Validation);

        let store = DedupError::from(IndexError::backend("connection refused"));
        assert_eq!(store.kind(), ErrorKind::Upstream);
        assert!(store.to_string().contains("connection refused"));
    }

    #[test]
    fn unimplemented_filter_modes_are_configuration() {
        let err = DedupError::from(FilterError::NotImplemented {
            what: "or mode".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.is_unsupported());

        let via_store = DedupError::from(IndexError::Filter(FilterError::NotImplemented {
            what: "or mode".into(),
        }));
        assert_eq!(via_store.kind(), ErrorKind::Configuration);
        assert!(via_store.is_unsupported());

        let malformed = DedupError::from(FilterError::MissingKey { spec: "{}".into() });
        assert_eq!(malformed.kind(), ErrorKind::Validation);
        assert!(!malformed.is_unsupported());
    }
}
