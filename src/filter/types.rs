use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Comparison operators accepted as bracketed query keys, e.g. `averageCost[gte]=1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl FilterOp {
    /// Map a bare operator token to its operator. Only the comparison tokens are
    /// recognised; `eq` is implicit and never written in a query string.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::In => "IN",
        }
    }
}

/// A single typed condition on one document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    In(String, Vec<Value>),
    /// GeoJSON point at `field` lies within `radius` radians of `center` (lng, lat).
    GeoWithin {
        field: String,
        center: (f64, f64),
        radius: f64,
    },
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        let field = field.into();
        match op {
            FilterOp::Eq => Predicate::Eq(field, value),
            FilterOp::Lt => Predicate::Lt(field, value),
            FilterOp::Lte => Predicate::Lte(field, value),
            FilterOp::Gt => Predicate::Gt(field, value),
            FilterOp::Gte => Predicate::Gte(field, value),
            FilterOp::In => match value {
                Value::Array(values) => Predicate::In(field, values),
                other => Predicate::In(field, vec![other]),
            },
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq(f, _)
            | Predicate::Lt(f, _)
            | Predicate::Lte(f, _)
            | Predicate::Gt(f, _)
            | Predicate::Gte(f, _)
            | Predicate::In(f, _) => f,
            Predicate::GeoWithin { field, .. } => field,
        }
    }

    pub fn op(&self) -> Option<FilterOp> {
        match self {
            Predicate::Eq(..) => Some(FilterOp::Eq),
            Predicate::Lt(..) => Some(FilterOp::Lt),
            Predicate::Lte(..) => Some(FilterOp::Lte),
            Predicate::Gt(..) => Some(FilterOp::Gt),
            Predicate::Gte(..) => Some(FilterOp::Gte),
            Predicate::In(..) => Some(FilterOp::In),
            Predicate::GeoWithin { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// Positional parameter collected while generating SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// JSON path as `text[]`, used with the `#>` operator.
    Path(Vec<String>),
    Json(Value),
    Float(f64),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Type a raw query-string value. Canonical integers and decimals become numbers,
/// `true`/`false` become booleans, anything else stays a string. Values with leading
/// zeros (zipcodes, phone numbers) are kept as strings.
pub fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if is_canonical_number(raw) {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }

    Value::String(raw.to_string())
}

fn is_canonical_number(raw: &str) -> bool {
    let unsigned = raw.strip_prefix('-').unwrap_or(raw);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if int_part.len() > 1 && int_part.starts_with('0') {
        return false;
    }
    match frac_part {
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

/// Resolve a dotted path (`location.city`) inside a JSON document.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Ordering between two values of the same JSON type; `None` across types.
pub fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Equality with numeric normalisation (`1` equals `1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Text form of a typed number or boolean, for matching fields that store it as a
/// string (`weeks: "8"` against `weeks=8`).
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Total order for sorting mixed documents, matching Postgres `jsonb` ordering:
/// null, strings, numbers, booleans, arrays, objects, then missing fields.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            Some(Value::Null) => 0,
            Some(Value::String(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::Bool(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
            // `#>` yields SQL NULL, which Postgres sorts last ascending
            None => 6,
        }
    }

    match (a, b) {
        (Some(x), Some(y)) => compare_same_type(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn types_query_values() {
        assert_eq!(typed_value("1000"), json!(1000));
        assert_eq!(typed_value("-4.5"), json!(-4.5));
        assert_eq!(typed_value("true"), json!(true));
        assert_eq!(typed_value("Web Development"), json!("Web Development"));
        assert_eq!(typed_value("02118"), json!("02118"));
        assert_eq!(typed_value("1e5"), json!("1e5"));
        assert_eq!(typed_value("3."), json!("3."));
    }

    #[test]
    fn scalar_text_of_typed_values() {
        assert_eq!(scalar_text(&typed_value("8")), Some("8".to_string()));
        assert_eq!(scalar_text(&typed_value("12.5")), Some("12.5".to_string()));
        assert_eq!(scalar_text(&typed_value("true")), Some("true".to_string()));
        assert_eq!(scalar_text(&json!("8")), None);
    }

    #[test]
    fn looks_up_nested_paths() {
        let doc = json!({ "location": { "city": "Boston", "coordinates": [-71.1, 42.3] } });
        assert_eq!(lookup(&doc, "location.city"), Some(&json!("Boston")));
        assert_eq!(lookup(&doc, "location.coordinates.1"), Some(&json!(42.3)));
        assert_eq!(lookup(&doc, "location.zip"), None);
    }

    #[test]
    fn sorts_like_jsonb() {
        let ascending = [json!(null), json!("a"), json!("b"), json!(1), json!(2), json!(false), json!(true), json!([1]), json!({"a": 1})];
        for pair in ascending.windows(2) {
            assert_eq!(compare_for_sort(Some(&pair[0]), Some(&pair[1])), Ordering::Less, "{} < {}", pair[0], pair[1]);
        }
        assert_eq!(compare_for_sort(Some(&json!(2)), Some(&json!("a"))), Ordering::Greater);
    }

    #[test]
    fn missing_fields_sort_after_values() {
        assert_eq!(compare_for_sort(None, Some(&json!({"a": 1}))), Ordering::Greater);
        assert_eq!(compare_for_sort(None, Some(&json!(null))), Ordering::Greater);
        assert_eq!(compare_for_sort(None, None), Ordering::Equal);
    }
}
