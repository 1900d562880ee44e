//! Conversion of compiled predicates into `qdrant_client` filters.
//!
//! `prefix` and `phrase` both map to qdrant's full-text match; their exact
//! semantics then depend on the collection's text index. `exists` maps to
//! "not is_empty", which matches the in-process evaluator.

use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::{
    Condition as QCondition, DatetimeRange as QDatetimeRange, Filter, MinShould, PointId, Range,
    RepeatedIntegers, RepeatedStrings, Timestamp,
};
use serde_json::Value;

use crate::error::FilterError;
use crate::predicate::{Condition, DatetimeRange, FieldCheck, Predicate};

impl TryFrom<&Predicate> for Filter {
    type Error = FilterError;

    fn try_from(predicate: &Predicate) -> Result<Self, Self::Error> {
        let must = convert_all(&predicate.must)?;
        let must_not = convert_all(&predicate.must_not)?;
        let should = convert_all(&predicate.should)?;
        let (should, min_should) = match predicate.min_should {
            Some(min_count) => (
                Vec::new(),
                Some(MinShould {
                    min_count: min_count as u64,
                    conditions: should,
                }),
            ),
            None => (should, None),
        };
        Ok(Filter {
            must,
            should,
            must_not,
            min_should,
        })
    }
}

/// Point ids are UUID strings or unsigned integers.
pub fn point_id(id: &str) -> PointId {
    match id.parse::<u64>() {
        Ok(num) => PointId::from(num),
        Err(_) => PointId::from(id.to_string()),
    }
}

fn convert_all(conditions: &[Condition]) -> Result<Vec<QCondition>, FilterError> {
    conditions.iter().map(convert).collect()
}

fn convert(condition: &Condition) -> Result<QCondition, FilterError> {
    match condition {
        Condition::HasId(ids) => Ok(QCondition::has_id(ids.iter().map(|id| point_id(id)))),
        Condition::Nested(inner) => Ok(QCondition::from(Filter::try_from(inner.as_ref())?)),
        Condition::Field { key, check } => convert_field(key, check),
    }
}

fn convert_field(key: &str, check: &FieldCheck) -> Result<QCondition, FilterError> {
    let condition = match check {
        FieldCheck::MatchValue(value) => QCondition::matches(key, scalar_match(key, value)?),
        FieldCheck::MatchAny(values) => QCondition::matches(key, list_match(key, values, false)?),
        FieldCheck::MatchExcept(values) => {
            QCondition::matches(key, list_match(key, values, true)?)
        }
        FieldCheck::Text(text) | FieldCheck::Phrase(text) | FieldCheck::Prefix(text) => {
            QCondition::matches_text(key, text.clone())
        }
        FieldCheck::Exists => QCondition::from(Filter {
            must_not: vec![QCondition::is_empty(key)],
            ..Default::default()
        }),
        FieldCheck::IsNull => QCondition::is_null(key),
        FieldCheck::IsEmpty => QCondition::is_empty(key),
        FieldCheck::Range(range) => QCondition::range(
            key,
            Range {
                gt: range.gt,
                gte: range.gte,
                lt: range.lt,
                lte: range.lte,
            },
        ),
        FieldCheck::DatetimeRange(range) => QCondition::datetime_range(key, datetime_range(range)),
    };
    Ok(condition)
}

fn scalar_match(key: &str, value: &Value) -> Result<MatchValue, FilterError> {
    match value {
        Value::String(s) => Ok(MatchValue::Keyword(s.clone())),
        Value::Bool(b) => Ok(MatchValue::Boolean(*b)),
        Value::Number(n) => n.as_i64().map(MatchValue::Integer).ok_or_else(|| {
            unsupported(key, value, "qdrant matches only integer numbers exactly")
        }),
        _ => Err(unsupported(key, value, "expected a string, integer or boolean")),
    }
}

fn list_match(key: &str, values: &[Value], except: bool) -> Result<MatchValue, FilterError> {
    if values.iter().all(Value::is_string) {
        let strings = values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        let repeated = RepeatedStrings { strings };
        return Ok(if except {
            MatchValue::ExceptKeywords(repeated)
        } else {
            MatchValue::Keywords(repeated)
        });
    }
    if values.iter().all(Value::is_i64) {
        let integers = values.iter().filter_map(Value::as_i64).collect();
        let repeated = RepeatedIntegers { integers };
        return Ok(if except {
            MatchValue::ExceptIntegers(repeated)
        } else {
            MatchValue::Integers(repeated)
        });
    }
    Err(unsupported(
        key,
        &Value::Array(values.to_vec()),
        "list must be all strings or all integers",
    ))
}

fn datetime_range(range: &DatetimeRange) -> QDatetimeRange {
    let ts = |dt: Option<chrono::DateTime<chrono::Utc>>| {
        dt.map(|dt| Timestamp {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos() as i32,
        })
    };
    QDatetimeRange {
        gt: ts(range.gt),
        gte: ts(range.gte),
        lt: ts(range.lt),
        lte: ts(range.lte),
    }
}

fn unsupported(key: &str, value: &Value, reason: &str) -> FilterError {
    FilterError::InvalidValue {
        spec: serde_json::json!({ "key": key, "value": value }).to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, compile_expr, CompileMode};
    use serde_json::json;

    #[test]
    fn conjunction_maps_to_must() {
        let pred = compile(
            &[
                json!({"key": "level", "value": "error"}),
                json!({"key": "code", "op": "in", "value": [500, 503]}),
            ],
            CompileMode::And,
        )
        .unwrap();
        let filter = Filter::try_from(&pred).unwrap();
        assert_eq!(filter.must.len(), 2);
        assert!(filter.should.is_empty());
        assert!(filter.min_should.is_none());
    }

    #[test]
    fn disjunction_maps_to_min_should() {
        let pred = compile_expr(&json!({
            "logic": "or",
            "clauses": [{"key": "a", "value": "x"}, {"key": "b", "value": "y"}]
        }))
        .unwrap();
        let filter = Filter::try_from(&pred).unwrap();
        let min_should = filter.min_should.expect("min_should");
        assert_eq!(min_should.min_count, 1);
        assert_eq!(min_should.conditions.len(), 2);
    }

    #[test]
    fn floats_cannot_be_matched_exactly() {
        let pred = compile_expr(&json!({"key": "ratio", "value": 0.5})).unwrap();
        assert!(matches!(
            Filter::try_from(&pred),
            Err(FilterError::InvalidValue { .. })
        ));
    }

    #[test]
    fn datetime_bounds_become_qdrant_timestamps() {
        let range = DatetimeRange {
            gte: chrono::DateTime::parse_from_rfc3339("2025-01-01T00:00:00.5Z")
                .ok()
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            ..Default::default()
        };
        let converted = datetime_range(&range);
        let gte: Timestamp = converted.gte.expect("gte bound");
        assert_eq!(gte.seconds, 1_735_689_600);
        assert_eq!(gte.nanos, 500_000_000);
        assert!(converted.lt.is_none());
    }

    #[test]
    fn point_ids_keep_uuid_strings() {
        let id = point_id("7f3a9c21-1b2c-4d5e-8f90-a1b2c3d4e5f6");
        assert!(id.point_id_options.is_some());
    }
}
