//! Compiled predicate tree and its in-process evaluator.
//!
//! The shape mirrors a vector-search filter: `must` conditions all hold,
//! `must_not` conditions all fail, and `should` conditions hold at least
//! `min_should` times (at least once when `min_should` is unset and `should`
//! is non-empty). [`Predicate::matches`] evaluates the tree against a JSON
//! payload, which is what the in-memory vector store uses.
//!
//! Payload keys may be dotted (`kubernetes.pod`). When a path lands on an
//! array, a condition holds if any element satisfies it.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    pub must: Vec<Condition>,
    pub should: Vec<Condition>,
    pub must_not: Vec<Condition>,
    pub min_should: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Field { key: String, check: FieldCheck },
    /// Point ids, independent of the payload.
    HasId(Vec<String>),
    Nested(Box<Predicate>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldCheck {
    MatchValue(Value),
    MatchAny(Vec<Value>),
    MatchExcept(Vec<Value>),
    Text(String),
    Phrase(String),
    Prefix(String),
    /// Present, not null and not an empty array.
    Exists,
    /// Present and null.
    IsNull,
    /// Missing, null or an empty array.
    IsEmpty,
    Range(NumericRange),
    DatetimeRange(DatetimeRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericRange {
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
}

impl NumericRange {
    pub fn contains(&self, v: f64) -> bool {
        self.gt.map_or(true, |b| v > b)
            && self.gte.map_or(true, |b| v >= b)
            && self.lt.map_or(true, |b| v < b)
            && self.lte.map_or(true, |b| v <= b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatetimeRange {
    pub gt: Option<DateTime<Utc>>,
    pub gte: Option<DateTime<Utc>>,
    pub lt: Option<DateTime<Utc>>,
    pub lte: Option<DateTime<Utc>>,
}

impl DatetimeRange {
    pub fn contains(&self, v: DateTime<Utc>) -> bool {
        self.gt.map_or(true, |b| v > b)
            && self.gte.map_or(true, |b| v >= b)
            && self.lt.map_or(true, |b| v < b)
            && self.lte.map_or(true, |b| v <= b)
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl Predicate {
    /// Predicate that matches every point.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            must: conditions.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Points whose id is one of `ids`.
    pub fn has_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::all([Condition::HasId(ids.into_iter().map(Into::into).collect())])
    }

    /// Points whose `key` equals `value`.
    pub fn field_equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all([Condition::field(key, FieldCheck::MatchValue(value.into()))])
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    pub fn matches(&self, id: &str, payload: &Map<String, Value>) -> bool {
        if !self.must.iter().all(|c| c.matches(id, payload)) {
            return false;
        }
        if self.must_not.iter().any(|c| c.matches(id, payload)) {
            return false;
        }
        let required = match self.min_should {
            Some(n) => n,
            None if self.should.is_empty() => 0,
            None => 1,
        };
        if required > 0 {
            let hits = self
                .should
                .iter()
                .filter(|c| c.matches(id, payload))
                .count();
            if hits < required {
                return false;
            }
        }
        true
    }
}

impl Condition {
    pub fn field(key: impl Into<String>, check: FieldCheck) -> Self {
        Condition::Field {
            key: key.into(),
            check,
        }
    }

    pub fn matches(&self, id: &str, payload: &Map<String, Value>) -> bool {
        match self {
            Condition::HasId(ids) => ids.iter().any(|candidate| candidate == id),
            Condition::Nested(inner) => inner.matches(id, payload),
            Condition::Field { key, check } => check.matches(lookup(payload, key)),
        }
    }
}

impl FieldCheck {
    fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            FieldCheck::IsEmpty => match field {
                None | Some(Value::Null) => true,
                Some(Value::Array(items)) => items.is_empty(),
                Some(_) => false,
            },
            FieldCheck::IsNull => matches!(field, Some(Value::Null)),
            FieldCheck::Exists => !FieldCheck::IsEmpty.matches(field),
            FieldCheck::MatchExcept(excluded) => {
                leaves(field).all(|v| !excluded.iter().any(|e| values_equal(v, e)))
            }
            FieldCheck::MatchValue(expected) => leaves(field).any(|v| values_equal(v, expected)),
            FieldCheck::MatchAny(options) => {
                leaves(field).any(|v| options.iter().any(|o| values_equal(v, o)))
            }
            FieldCheck::Text(needle) | FieldCheck::Phrase(needle) => {
                leaves(field).any(|v| v.as_str().is_some_and(|s| s.contains(needle.as_str())))
            }
            FieldCheck::Prefix(prefix) => leaves(field)
                .any(|v| v.as_str().is_some_and(|s| s.starts_with(prefix.as_str()))),
            FieldCheck::Range(range) => {
                leaves(field).any(|v| as_number(v).is_some_and(|n| range.contains(n)))
            }
            FieldCheck::DatetimeRange(range) => leaves(field).any(|v| {
                v.as_str()
                    .and_then(parse_datetime)
                    .is_some_and(|dt| range.contains(dt))
            }),
        }
    }
}

/// Resolve a dotted key path in `payload`.
fn lookup<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(direct) = payload.get(key) {
        return Some(direct);
    }
    let mut parts = key.split('.');
    let mut current = payload.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// The value itself, or its elements when it is an array.
fn leaves(field: Option<&Value>) -> Box<dyn Iterator<Item = &Value> + '_> {
    match field {
        None => Box::new(std::iter::empty()),
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(value) => Box::new(std::iter::once(value)),
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn empty_predicate_matches_everything() {
        assert!(Predicate::any().matches("x", &Map::new()));
    }

    #[test]
    fn match_value_handles_arrays_and_numbers() {
        let p = payload(json!({"tags": ["a", "b"], "code": 500}));
        assert!(FieldCheck::MatchValue(json!("b")).matches(p.get("tags")));
        assert!(FieldCheck::MatchValue(json!(500.0)).matches(p.get("code")));
        assert!(!FieldCheck::MatchValue(json!("c")).matches(p.get("tags")));
    }

    #[test]
    fn null_empty_and_exists() {
        let p = payload(json!({"a": null, "b": [], "c": "x"}));
        assert!(FieldCheck::IsNull.matches(p.get("a")));
        assert!(!FieldCheck::IsNull.matches(p.get("missing")));
        assert!(FieldCheck::IsEmpty.matches(p.get("b")));
        assert!(FieldCheck::IsEmpty.matches(p.get("missing")));
        assert!(FieldCheck::Exists.matches(p.get("c")));
        assert!(!FieldCheck::Exists.matches(p.get("a")));
    }

    #[test]
    fn except_passes_missing_fields() {
        let check = FieldCheck::MatchExcept(vec![json!("debug")]);
        assert!(check.matches(None));
        assert!(check.matches(Some(&json!("info"))));
        assert!(!check.matches(Some(&json!("debug"))));
    }

    #[test]
    fn ranges() {
        let range = NumericRange {
            gte: Some(1.0),
            lt: Some(3.0),
            ..Default::default()
        };
        assert!(range.contains(1.0));
        assert!(!range.contains(3.0));

        let dt = DatetimeRange {
            gte: parse_datetime("2025-01-01"),
            ..Default::default()
        };
        let check = FieldCheck::DatetimeRange(dt);
        assert!(check.matches(Some(&json!("2025-03-04T05:06:07Z"))));
        assert!(!check.matches(Some(&json!("2024-12-31T23:59:59Z"))));
        assert!(!check.matches(Some(&json!("not a date"))));
    }

    #[test]
    fn dotted_paths_resolve_nested_objects() {
        let p = payload(json!({"k8s": {"pod": "web-1"}}));
        let pred = Predicate::field_equals("k8s.pod", "web-1");
        assert!(pred.matches("id", &p));
    }

    #[test]
    fn should_needs_min_hits() {
        let p = payload(json!({"level": "warn"}));
        let mut pred = Predicate {
            should: vec![
                Condition::field("level", FieldCheck::MatchValue(json!("warn"))),
                Condition::field("level", FieldCheck::MatchValue(json!("error"))),
            ],
            min_should: Some(1),
            ..Default::default()
        };
        assert!(pred.matches("id", &p));
        pred.min_should = Some(2);
        assert!(!pred.matches("id", &p));
    }

    #[test]
    fn has_id_ignores_payload() {
        let pred = Predicate::has_ids(["a", "b"]);
        assert!(pred.matches("b", &Map::new()));
        assert!(!pred.matches("c", &Map::new()));
    }
}
