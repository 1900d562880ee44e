//! Parsed form of the JSON filter-spec wire format.
//!
//! Atomic: `{"key": .., "dtype": .., "op": .., "value": ..}`.
//! Logical: `{"logic": "and" | "or" | "not", "clauses": [expr, ...]}`.
//!
//! `dtype` defaults to `string` and `op` to `equals`; both are matched
//! case-insensitively. A spec is logical when it carries a non-null `logic`
//! member.

use serde_json::Value;

use crate::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    String,
    Number,
    Boolean,
    Datetime,
}

impl Dtype {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" | "keyword" => Some(Dtype::String),
            "number" | "integer" | "float" => Some(Dtype::Number),
            "boolean" | "bool" => Some(Dtype::Boolean),
            "datetime" | "date" | "timestamp" => Some(Dtype::Datetime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    In,
    NotIn,
    Text,
    Phrase,
    Prefix,
    Exists,
    IsNull,
    IsEmpty,
    HasId,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
}

impl Op {
    fn parse(raw: &str) -> Option<Self> {
        let op = match raw {
            "equals" | "eq" => Op::Equals,
            "in" => Op::In,
            "not_in" => Op::NotIn,
            "contains" | "text" => Op::Text,
            "phrase" => Op::Phrase,
            "prefix" => Op::Prefix,
            "exists" | "has_field" => Op::Exists,
            "is_null" => Op::IsNull,
            "is_empty" => Op::IsEmpty,
            "has_id" => Op::HasId,
            "gt" => Op::Gt,
            "gte" => Op::Gte,
            "lt" => Op::Lt,
            "lte" => Op::Lte,
            "between" | "range" => Op::Between,
            _ => return None,
        };
        Some(op)
    }

    /// Bound name for the single-sided range ops.
    pub(crate) fn bound_name(self) -> Option<&'static str> {
        match self {
            Op::Gt => Some("gt"),
            Op::Gte => Some("gte"),
            Op::Lt => Some("lt"),
            Op::Lte => Some("lte"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomicSpec {
    /// Payload key. `None` only for `has_id`.
    pub key: Option<String>,
    pub dtype: Dtype,
    pub op: Op,
    pub value: Value,
    /// The spec as received, kept for error reporting.
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSpec {
    pub logic: Logic,
    pub clauses: Vec<FilterSpec>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    Atomic(AtomicSpec),
    Logical(LogicalSpec),
}

/// True when `spec` is a logical expression rather than an atomic one.
pub fn is_logical(spec: &Value) -> bool {
    spec.get("logic").is_some_and(|logic| !logic.is_null())
}

/// Parse `--filter`-style input: one spec object or an array of them.
pub fn parse_specs(json: &str) -> Result<Vec<Value>, FilterError> {
    let parsed: Value = serde_json::from_str(json).map_err(|err| FilterError::InvalidValue {
        spec: json.to_string(),
        reason: err.to_string(),
    })?;
    match parsed {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => Err(FilterError::InvalidValue {
            spec: other.to_string(),
            reason: "expected a spec object or an array of specs".into(),
        }),
    }
}

fn lowered(spec: &Value, field: &str, default: &str) -> Result<String, Value> {
    match spec.get(field) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(s)) if s.is_empty() => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.to_lowercase()),
        Some(other) => Err(other.clone()),
    }
}

impl TryFrom<&Value> for FilterSpec {
    type Error = FilterError;

    fn try_from(spec: &Value) -> Result<Self, Self::Error> {
        if !spec.is_object() {
            return Err(FilterError::InvalidValue {
                spec: spec.to_string(),
                reason: "spec must be a JSON object".into(),
            });
        }
        if is_logical(spec) {
            LogicalSpec::try_from(spec).map(FilterSpec::Logical)
        } else {
            AtomicSpec::try_from(spec).map(FilterSpec::Atomic)
        }
    }
}

impl TryFrom<&Value> for LogicalSpec {
    type Error = FilterError;

    fn try_from(spec: &Value) -> Result<Self, Self::Error> {
        let logic = match spec.get("logic") {
            Some(Value::String(s)) => s.to_lowercase(),
            other => {
                return Err(FilterError::UnsupportedLogic {
                    logic: other.map(Value::to_string).unwrap_or_default(),
                    spec: spec.to_string(),
                })
            }
        };
        let logic = match logic.as_str() {
            "and" => Logic::And,
            "or" => Logic::Or,
            "not" => Logic::Not,
            _ => {
                return Err(FilterError::UnsupportedLogic {
                    logic,
                    spec: spec.to_string(),
                })
            }
        };

        let clauses = match spec.get("clauses") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return Err(FilterError::EmptyClauses {
                    spec: spec.to_string(),
                })
            }
        };
        let clauses = clauses
            .iter()
            .map(FilterSpec::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LogicalSpec {
            logic,
            clauses,
            raw: spec.clone(),
        })
    }
}

impl TryFrom<&Value> for AtomicSpec {
    type Error = FilterError;

    fn try_from(spec: &Value) -> Result<Self, Self::Error> {
        let op_raw = lowered(spec, "op", "equals").map_err(|bad| FilterError::UnsupportedOp {
            op: bad.to_string(),
            spec: spec.to_string(),
        })?;
        let op = Op::parse(&op_raw).ok_or_else(|| FilterError::UnsupportedOp {
            op: op_raw.clone(),
            spec: spec.to_string(),
        })?;

        let dtype_raw =
            lowered(spec, "dtype", "string").map_err(|bad| FilterError::UnsupportedDtype {
                dtype: bad.to_string(),
                spec: spec.to_string(),
            })?;
        let dtype = Dtype::parse(&dtype_raw).ok_or_else(|| FilterError::UnsupportedDtype {
            dtype: dtype_raw.clone(),
            spec: spec.to_string(),
        })?;

        let key = match spec.get("key") {
            Some(Value::String(k)) if !k.is_empty() => Some(k.clone()),
            _ => None,
        };
        if key.is_none() && op != Op::HasId {
            return Err(FilterError::MissingKey {
                spec: spec.to_string(),
            });
        }

        Ok(AtomicSpec {
            key,
            dtype,
            op,
            value: spec.get("value").cloned().unwrap_or(Value::Null),
            raw: spec.clone(),
        })
    }
}
