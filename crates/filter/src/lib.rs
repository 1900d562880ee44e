//! # logdup filter compiler
//!
//! Compiles JSON filter specs into a [`Predicate`] tree shaped like a
//! vector-search filter (`must` / `should` / `must_not` / `min_should`).
//!
//! ## Wire format
//!
//! - Atomic: `{"key": "pod_name", "dtype": "string", "op": "in", "value": ["a", "b"]}`
//! - Logical: `{"logic": "or", "clauses": [<expr>, <expr>]}`
//!
//! Supported ops: `equals|eq`, `in`, `not_in`, `contains|text`, `phrase`,
//! `prefix`, `exists|has_field`, `is_null`, `is_empty`, `has_id`,
//! `gt|gte|lt|lte`, `between|range`. Range values accept a bound map, a
//! two-element list or an `"a, b"` string. With a `datetime` dtype the bounds
//! are RFC 3339 timestamps.
//!
//! Compiled predicates evaluate in-process with [`Predicate::matches`] and,
//! with the `qdrant` feature, convert into `qdrant_client::qdrant::Filter`.
//!
//! ```
//! use filter::{compile, CompileMode};
//! use serde_json::json;
//!
//! let pred = compile(
//!     &[json!({"key": "pod_name", "op": "in", "value": ["api-1", "api-2"]})],
//!     CompileMode::And,
//! )
//! .unwrap();
//! let payload = json!({"pod_name": "api-2"});
//! assert!(pred.matches("some-id", payload.as_object().unwrap()));
//! ```

mod compile;
mod error;
mod predicate;
mod spec;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use crate::compile::{compile, compile_each, compile_expr, compile_json, CompileMode};
pub use crate::error::FilterError;
pub use crate::predicate::{
    parse_datetime, Condition, DatetimeRange, FieldCheck, NumericRange, Predicate,
};
pub use crate::spec::{is_logical, parse_specs, AtomicSpec, Dtype, FilterSpec, Logic, LogicalSpec, Op};
