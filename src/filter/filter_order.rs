use std::cmp::Ordering;

use serde_json::Value;

use super::types::{compare_for_sort, lookup, SortDirection, SortKey, SqlParam};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `name,-averageCost` into ordered sort keys. A leading `-` means descending.
    pub fn parse(sort: &str) -> Vec<SortKey> {
        sort.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty() && *part != "-")
            .map(|part| match part.strip_prefix('-') {
                Some(field) => SortKey::desc(field),
                None => SortKey::asc(part),
            })
            .collect()
    }

    /// Newest first.
    pub fn default_keys() -> Vec<SortKey> {
        vec![SortKey::desc("createdAt")]
    }

    pub fn compare(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
        for key in keys {
            let ordering = compare_for_sort(lookup(a, &key.field), lookup(b, &key.field));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// `ORDER BY` over the `doc` JSONB column; field paths are bound as parameters.
    pub fn generate(keys: &[SortKey], params: &mut Vec<SqlParam>) -> String {
        if keys.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = keys
            .iter()
            .map(|key| {
                params.push(SqlParam::Path(key.field.split('.').map(str::to_string).collect()));
                format!("\"doc\" #> ${}::text[] {}", params.len(), key.direction.to_sql())
            })
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mixed_directions() {
        let keys = FilterOrder::parse("name,-averageCost, ,-");
        assert_eq!(keys, vec![SortKey::asc("name"), SortKey::desc("averageCost")]);
    }

    #[test]
    fn compares_by_successive_keys() {
        let keys = FilterOrder::parse("housing,-averageCost");
        let a = json!({ "housing": false, "averageCost": 5 });
        let b = json!({ "housing": false, "averageCost": 9 });
        assert_eq!(FilterOrder::compare(&a, &b, &keys), Ordering::Greater);
    }

    #[test]
    fn missing_fields_trail_ascending_and_lead_descending() {
        let priced = json!({ "averageCost": 1000 });
        let unpriced = json!({ "name": "No courses yet" });
        let asc = FilterOrder::parse("averageCost");
        let desc = FilterOrder::parse("-averageCost");
        assert_eq!(FilterOrder::compare(&unpriced, &priced, &asc), Ordering::Greater);
        assert_eq!(FilterOrder::compare(&unpriced, &priced, &desc), Ordering::Less);
    }

    #[test]
    fn generates_order_by_with_bound_paths() {
        let mut params = vec![];
        let sql = FilterOrder::generate(&FilterOrder::parse("-location.city,name"), &mut params);
        assert_eq!(sql, "ORDER BY \"doc\" #> $1::text[] DESC, \"doc\" #> $2::text[] ASC");
        assert_eq!(params[0], SqlParam::Path(vec!["location".into(), "city".into()]));
    }
}
