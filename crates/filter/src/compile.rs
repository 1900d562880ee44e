use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::FilterError;
use crate::predicate::{
    parse_datetime, Condition, DatetimeRange, FieldCheck, NumericRange, Predicate,
};
use crate::spec::{is_logical, AtomicSpec, Dtype, FilterSpec, Logic, LogicalSpec, Op};

/// How a flat list of atomic specs is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    #[default]
    And,
    Or,
}

impl FromStr for CompileMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "and" => Ok(CompileMode::And),
            "or" => Ok(CompileMode::Or),
            _ => Err(FilterError::UnsupportedMode { mode: s.to_string() }),
        }
    }
}

/// Compile a list of specs into one predicate.
///
/// When any spec is logical, every spec compiles on its own (see
/// [`compile_each`]) and the results are conjoined. Otherwise the atomic
/// specs are wrapped according to `mode`; `Or` over a flat atomic list is not
/// implemented. An empty list compiles to a predicate that matches
/// everything.
pub fn compile(specs: &[Value], mode: CompileMode) -> Result<Predicate, FilterError> {
    if specs.iter().any(is_logical) {
        let mut each = compile_each(specs)?;
        if each.len() == 1 {
            return Ok(each.remove(0));
        }
        return Ok(Predicate::all(
            each.into_iter().map(|p| Condition::Nested(Box::new(p))),
        ));
    }

    let conditions = specs
        .iter()
        .map(|spec| AtomicSpec::try_from(spec).and_then(|atomic| atomic_condition(&atomic)))
        .collect::<Result<Vec<_>, _>>()?;

    match mode {
        CompileMode::And => {
            debug!(conditions = conditions.len(), "built AND filter from atomic specs");
            Ok(Predicate::all(conditions))
        }
        CompileMode::Or => {
            error!("mode 'or' is not implemented for atomic spec lists");
            Err(FilterError::NotImplemented {
                what: "mode 'or' over atomic specs".into(),
            })
        }
    }
}

/// Compile every spec into its own predicate.
pub fn compile_each(specs: &[Value]) -> Result<Vec<Predicate>, FilterError> {
    let predicates = specs
        .iter()
        .map(compile_expr)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(filters = predicates.len(), "built filters from logical expressions");
    Ok(predicates)
}

/// Compile a single atomic or logical expression.
pub fn compile_expr(spec: &Value) -> Result<Predicate, FilterError> {
    let parsed =
        FilterSpec::try_from(spec).inspect_err(|err| error!(%err, "invalid filter spec"))?;
    build(&parsed)
}

/// Parse a JSON document (one spec or an array) and compile it.
pub fn compile_json(json: &str, mode: CompileMode) -> Result<Predicate, FilterError> {
    let specs = crate::spec::parse_specs(json)?;
    compile(&specs, mode)
}

fn build(spec: &FilterSpec) -> Result<Predicate, FilterError> {
    match spec {
        FilterSpec::Atomic(atomic) => Ok(Predicate::all([atomic_condition(atomic)?])),
        FilterSpec::Logical(logical) => build_logical(logical),
    }
}

fn build_logical(spec: &LogicalSpec) -> Result<Predicate, FilterError> {
    let conditions = spec
        .clauses
        .iter()
        .map(|clause| match clause {
            FilterSpec::Atomic(atomic) => atomic_condition(atomic),
            FilterSpec::Logical(nested) => {
                build_logical(nested).map(|p| Condition::Nested(Box::new(p)))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match spec.logic {
        Logic::And => Predicate::all(conditions),
        Logic::Or => Predicate {
            should: conditions,
            min_should: Some(1),
            ..Predicate::default()
        },
        Logic::Not => Predicate {
            must_not: conditions,
            ..Predicate::default()
        },
    })
}

fn atomic_condition(spec: &AtomicSpec) -> Result<Condition, FilterError> {
    let check = match spec.op {
        Op::HasId => {
            let ids = as_list(&spec.value)
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            return Ok(Condition::HasId(ids));
        }
        Op::Equals => FieldCheck::MatchValue(coerce(spec, &spec.value)?),
        Op::In => FieldCheck::MatchAny(coerce_list(spec)?),
        Op::NotIn => FieldCheck::MatchExcept(coerce_list(spec)?),
        Op::Text => FieldCheck::Text(as_text(&spec.value)),
        Op::Phrase => FieldCheck::Phrase(as_text(&spec.value)),
        Op::Prefix => FieldCheck::Prefix(as_text(&spec.value)),
        Op::Exists => FieldCheck::Exists,
        Op::IsNull => FieldCheck::IsNull,
        Op::IsEmpty => FieldCheck::IsEmpty,
        Op::Gt | Op::Gte | Op::Lt | Op::Lte | Op::Between => range_check(spec)?,
    };

    let key = spec.key.clone().ok_or_else(|| FilterError::MissingKey {
        spec: spec.raw.to_string(),
    })?;
    Ok(Condition::field(key, check))
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Bring string-encoded scalars in line with a numeric or boolean dtype.
fn coerce(spec: &AtomicSpec, value: &Value) -> Result<Value, FilterError> {
    let invalid = |reason: &str| FilterError::InvalidValue {
        spec: spec.raw.to_string(),
        reason: reason.to_string(),
    };
    match (spec.dtype, value) {
        (_, Value::Null) => Err(invalid("value is required")),
        (_, Value::Array(_) | Value::Object(_)) => Err(invalid("expected a scalar value")),
        (Dtype::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|n| serde_json::Number::from_f64(n).map(|n| integral(n, s)))
            .ok_or_else(|| invalid("expected a number")),
        (Dtype::Boolean, Value::String(s)) => match s.to_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("expected a boolean")),
        },
        (_, scalar) => Ok(scalar.clone()),
    }
}

/// Keep integers integral so keyword/integer matching stays exact.
fn integral(n: serde_json::Number, raw: &str) -> Value {
    match raw.trim().parse::<i64>() {
        Ok(i) => Value::from(i),
        Err(_) => Value::Number(n),
    }
}

fn coerce_list(spec: &AtomicSpec) -> Result<Vec<Value>, FilterError> {
    as_list(&spec.value)
        .iter()
        .map(|v| coerce(spec, v))
        .collect()
}

const BOUND_NAMES: [&str; 4] = ["gt", "gte", "lt", "lte"];

/// Normalize a range value into a `{gt, gte, lt, lte}` subset.
fn parse_range_value(spec: &AtomicSpec) -> Result<Map<String, Value>, FilterError> {
    let value = &spec.value;
    let unsupported = || FilterError::UnsupportedRange {
        value: value.to_string(),
        spec: spec.raw.to_string(),
    };
    let bounds = match value {
        Value::Object(map) => {
            if map.is_empty() || map.keys().any(|k| !BOUND_NAMES.contains(&k.as_str())) {
                return Err(unsupported());
            }
            map.clone()
        }
        Value::Array(items) if items.len() == 2 => {
            let mut map = Map::new();
            map.insert("gte".into(), items[0].clone());
            map.insert("lte".into(), items[1].clone());
            map
        }
        Value::String(s) if s.contains(',') => {
            let (start, end) = s.split_once(',').ok_or_else(unsupported)?;
            let mut map = Map::new();
            map.insert("gte".into(), Value::String(start.trim().to_string()));
            map.insert("lte".into(), Value::String(end.trim().to_string()));
            map
        }
        _ => {
            error!(value = %value, "unsupported range value format");
            return Err(unsupported());
        }
    };
    Ok(bounds)
}

fn range_check(spec: &AtomicSpec) -> Result<FieldCheck, FilterError> {
    let bounds = match spec.op.bound_name() {
        Some(name) => {
            let mut map = Map::new();
            map.insert(name.to_string(), spec.value.clone());
            map
        }
        None => parse_range_value(spec)?,
    };

    if spec.dtype == Dtype::Datetime {
        let bound = |name: &str| -> Result<Option<_>, FilterError> {
            match bounds.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(raw)) => parse_datetime(raw.trim()).map(Some).ok_or_else(|| {
                    FilterError::InvalidTimestamp {
                        value: raw.clone(),
                        spec: spec.raw.to_string(),
                    }
                }),
                Some(other) => Err(FilterError::InvalidTimestamp {
                    value: other.to_string(),
                    spec: spec.raw.to_string(),
                }),
            }
        };
        return Ok(FieldCheck::DatetimeRange(DatetimeRange {
            gt: bound("gt")?,
            gte: bound("gte")?,
            lt: bound("lt")?,
            lte: bound("lte")?,
        }));
    }

    let bound = |name: &str| -> Result<Option<f64>, FilterError> {
        match bounds.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(raw)) => raw.trim().parse().map(Some).map_err(|_| {
                FilterError::InvalidValue {
                    spec: spec.raw.to_string(),
                    reason: format!("range bound {name}={raw:?} is not a number"),
                }
            }),
            Some(other) => Err(FilterError::InvalidValue {
                spec: spec.raw.to_string(),
                reason: format!("range bound {name}={other} is not a number"),
            }),
        }
    };
    Ok(FieldCheck::Range(NumericRange {
        gt: bound("gt")?,
        gte: bound("gte")?,
        lt: bound("lt")?,
        lte: bound("lte")?,
    }))
}
