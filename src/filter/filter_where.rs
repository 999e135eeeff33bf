use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{scalar_text, FilterOp, Predicate, SqlParam};

/// Renders a [`Filter`] as a SQL condition over the `doc` JSONB column.
///
/// Field paths and values are always bound as positional parameters, so arbitrary
/// query-string keys never reach the SQL text.
pub struct FilterWhere<'p> {
    params: &'p mut Vec<SqlParam>,
}

impl<'p> FilterWhere<'p> {
    pub fn generate(filter: &Filter, params: &'p mut Vec<SqlParam>) -> Result<String, FilterError> {
        let mut filter_where = Self { params };
        let mut conditions = vec![];
        for predicate in filter.predicates() {
            conditions.push(filter_where.build_condition(predicate)?);
        }
        if conditions.is_empty() {
            Ok("1=1".to_string())
        } else {
            Ok(conditions.join(" AND "))
        }
    }

    fn build_condition(&mut self, predicate: &Predicate) -> Result<String, FilterError> {
        let field = self.field(predicate.field());
        match predicate {
            Predicate::Eq(_, value) => Ok(self.equality(&field, value)),
            Predicate::In(_, values) => {
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let parts: Vec<String> = values.iter().map(|v| self.equality(&field, v)).collect();
                Ok(format!("({})", parts.join(" OR ")))
            }
            Predicate::Lt(_, value)
            | Predicate::Lte(_, value)
            | Predicate::Gt(_, value)
            | Predicate::Gte(_, value) => {
                let op = predicate.op().unwrap_or(FilterOp::Eq).to_sql();
                let param = self.param(SqlParam::Json(value.clone()));
                Ok(format!(
                    "(jsonb_typeof({field}) = jsonb_typeof({param}::jsonb) AND {field} {op} {param}::jsonb)"
                ))
            }
            Predicate::GeoWithin { center: (lng, lat), radius, .. } => {
                if !lng.is_finite() || !lat.is_finite() || !radius.is_finite() {
                    return Err(FilterError::InvalidOperatorData(
                        "geo radius requires finite coordinates".to_string(),
                    ));
                }
                let lng = self.param(SqlParam::Float(*lng));
                let lat = self.param(SqlParam::Float(*lat));
                let radius = self.param(SqlParam::Float(*radius));
                let doc_lng = format!("({field} #>> '{{coordinates,0}}')::float8");
                let doc_lat = format!("({field} #>> '{{coordinates,1}}')::float8");
                Ok(format!(
                    "(jsonb_typeof({field} -> 'coordinates') = 'array' AND 2 * asin(LEAST(1.0, sqrt(\
                     power(sin(radians({doc_lat} - {lat}) / 2), 2) + \
                     cos(radians({lat})) * cos(radians({doc_lat})) * \
                     power(sin(radians({doc_lng} - {lng}) / 2), 2)))) <= {radius})"
                ))
            }
        }
    }

    fn equality(&mut self, field: &str, value: &Value) -> String {
        if value.is_null() {
            return format!("({field} IS NULL OR {field} = 'null'::jsonb)");
        }
        let strict = self.strict_equality(field, value);
        match scalar_text(value) {
            // Numbers and booleans also match fields that store the same text
            Some(text) => format!("({strict} OR {})", self.strict_equality(field, &Value::String(text))),
            None => strict,
        }
    }

    fn strict_equality(&mut self, field: &str, value: &Value) -> String {
        let param = self.param(SqlParam::Json(value.clone()));
        format!(
            "({field} = {param}::jsonb OR (jsonb_typeof({field}) = 'array' AND {field} @> jsonb_build_array({param}::jsonb)))"
        )
    }

    fn field(&mut self, path: &str) -> String {
        let segments = path.split('.').map(str::to_string).collect();
        let param = self.param(SqlParam::Path(segments));
        format!("(\"doc\" #> {param}::text[])")
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_is_tautology() {
        let mut params = vec![];
        assert_eq!(FilterWhere::generate(&Filter::new(), &mut params).unwrap(), "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn comparison_binds_path_and_value() {
        let filter = Filter::new().and(Predicate::new("averageCost", FilterOp::Gte, json!(1000)));
        let mut params = vec![];
        let sql = FilterWhere::generate(&filter, &mut params).unwrap();
        assert!(sql.contains("(\"doc\" #> $1::text[]) >= $2::jsonb"), "{sql}");
        assert_eq!(params[0], SqlParam::Path(vec!["averageCost".into()]));
        assert_eq!(params[1], SqlParam::Json(json!(1000)));
    }

    #[test]
    fn numeric_equality_also_binds_text_form() {
        let filter = Filter::new().eq("weeks", 8);
        let mut params = vec![];
        let sql = FilterWhere::generate(&filter, &mut params).unwrap();
        assert!(sql.contains("= $2::jsonb"), "{sql}");
        assert!(sql.contains("= $3::jsonb"), "{sql}");
        assert_eq!(params[1], SqlParam::Json(json!(8)));
        assert_eq!(params[2], SqlParam::Json(json!("8")));
    }

    #[test]
    fn string_equality_binds_once() {
        let mut params = vec![];
        FilterWhere::generate(&Filter::new().eq("name", "Devworks"), &mut params).unwrap();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let filter = Filter::new().and(Predicate::In("careers".into(), vec![]));
        let mut params = vec![];
        assert_eq!(FilterWhere::generate(&filter, &mut params).unwrap(), "1=0");
    }

    #[test]
    fn rejects_non_finite_geo() {
        let filter = Filter::new().and(Predicate::GeoWithin {
            field: "location".into(),
            center: (f64::NAN, 1.0),
            radius: 0.1,
        });
        let mut params = vec![];
        assert!(FilterWhere::generate(&filter, &mut params).is_err());
    }
}
