use std::cmp::Ordering;

use serde_json::Value;

use super::types::{compare_same_type, lookup, scalar_text, values_equal, Predicate};

/// Conjunction of typed predicates. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::Eq(field.into(), value.into()))
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.predicates.iter().all(|p| predicate_matches(p, doc))
    }
}

fn predicate_matches(predicate: &Predicate, doc: &Value) -> bool {
    let field = lookup(doc, predicate.field());
    match predicate {
        Predicate::Eq(_, expected) => eq_matches(field, expected),
        Predicate::In(_, candidates) => candidates.iter().any(|c| eq_matches(field, c)),
        Predicate::Lt(_, bound) => range_matches(field, bound, |o| o == Ordering::Less),
        Predicate::Lte(_, bound) => range_matches(field, bound, |o| o != Ordering::Greater),
        Predicate::Gt(_, bound) => range_matches(field, bound, |o| o == Ordering::Greater),
        Predicate::Gte(_, bound) => range_matches(field, bound, |o| o != Ordering::Less),
        Predicate::GeoWithin { center, radius, .. } => field
            .and_then(point_coordinates)
            .map(|point| central_angle(*center, point) <= *radius)
            .unwrap_or(false),
    }
}

// A typed number or boolean also matches a field holding the same text.
fn eq_matches(field: Option<&Value>, expected: &Value) -> bool {
    strict_eq_matches(field, expected)
        || scalar_text(expected).is_some_and(|text| strict_eq_matches(field, &Value::String(text)))
}

// Array fields match when any element matches, or when the whole array equals the value.
fn strict_eq_matches(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(Value::Array(items)) => {
            values_equal(&Value::Array(items.clone()), expected)
                || items.iter().any(|item| values_equal(item, expected))
        }
        Some(actual) => values_equal(actual, expected),
    }
}

fn range_matches(field: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        None => false,
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare_same_type(item, bound).map(&accept).unwrap_or(false)),
        Some(actual) => compare_same_type(actual, bound).map(accept).unwrap_or(false),
    }
}

/// `(lng, lat)` of a GeoJSON point, or of a bare `[lng, lat]` pair.
fn point_coordinates(value: &Value) -> Option<(f64, f64)> {
    let coords = match value {
        Value::Object(map) => map.get("coordinates")?,
        other => other,
    };
    let pair = coords.as_array()?;
    Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
}

/// Great-circle angle in radians between two `(lng, lat)` points.
pub fn central_angle(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lat2) = (a.1.to_radians(), b.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.0 - a.0).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}
