use thiserror::Error;

/// Filter compilation and evaluation failures.
///
/// Every variant except `NotImplemented` is a validation error and carries the
/// offending spec serialized as JSON.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("missing 'key' in spec: {spec}")]
    MissingKey { spec: String },

    #[error("unsupported op={op:?} for spec: {spec}")]
    UnsupportedOp { op: String, spec: String },

    #[error("unsupported dtype={dtype:?} for spec: {spec}")]
    UnsupportedDtype { dtype: String, spec: String },

    #[error("unsupported range value format {value} in spec: {spec}")]
    UnsupportedRange { value: String, spec: String },

    #[error("logical expr must have non-empty list 'clauses': {spec}")]
    EmptyClauses { spec: String },

    #[error("unsupported logic={logic:?} in expr: {spec}")]
    UnsupportedLogic { logic: String, spec: String },

    #[error("unsupported mode={mode:?}; use 'and' or 'or'")]
    UnsupportedMode { mode: String },

    #[error("{what} is not implemented")]
    NotImplemented { what: String },

    #[error("invalid value in spec {spec}: {reason}")]
    InvalidValue { spec: String, reason: String },

    #[error("invalid RFC 3339 timestamp {value:?} in spec: {spec}")]
    InvalidTimestamp { value: String, spec: String },
}

impl FilterError {
    /// True for malformed input; false only for `NotImplemented`.
    pub fn is_validation(&self) -> bool {
        !matches!(self, FilterError::NotImplemented { .. })
    }
}
