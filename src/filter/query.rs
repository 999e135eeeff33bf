use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::filter::Filter;
use super::filter_order::FilterOrder;
use super::types::{typed_value, FilterOp, Predicate, SortKey};
use crate::config::QueryConfig;

/// Query-string keys that shape the result instead of filtering it.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Largest offset a store accepts (Postgres `bigint`).
pub const MAX_SKIP: u64 = i64::MAX as u64;

/// Structured filter, sort, projection and page derived from one request's query string.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub filter: Filter,
    pub sort_keys: Vec<SortKey>,
    pub selected_fields: Option<Vec<String>>,
    pub page: u64,
    pub limit: u64,
}

impl QueryPlan {
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit).min(MAX_SKIP)
    }

    /// `next` when more matching documents exist past this page, `prev` past page one.
    pub fn pagination(&self, total: u64) -> Pagination {
        let next = (self.skip().saturating_add(self.limit) < total)
            .then(|| PageRef { page: self.page + 1, limit: self.limit });
        let prev = (self.page > 1).then(|| PageRef { page: self.page - 1, limit: self.limit });
        Pagination { next, prev }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Turns raw query parameters into a [`QueryPlan`].
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    reserved: Vec<String>,
    default_limit: u64,
    max_limit: Option<u64>,
    debug_logging: bool,
}

impl QueryTranslator {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            reserved: RESERVED_KEYS.iter().map(|k| k.to_string()).collect(),
            default_limit: config.default_limit.max(1),
            max_limit: config.max_limit,
            debug_logging: config.debug_logging,
        }
    }

    pub fn translate(&self, raw: &HashMap<String, String>) -> QueryPlan {
        // Sorted so the predicate order is stable for a given query string.
        let filter_source: BTreeMap<&String, &String> = raw
            .iter()
            .filter(|(key, _)| !self.reserved.iter().any(|r| r == *key))
            .collect();

        let mut filter = Filter::new();
        for (key, value) in filter_source {
            filter.push(Self::predicate(key, value));
        }

        let selected_fields = self.get(raw, "select").map(|select| {
            select
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        let sort_keys = match self.get(raw, "sort").map(FilterOrder::parse) {
            Some(keys) if !keys.is_empty() => keys,
            _ => FilterOrder::default_keys(),
        };

        let page = coerce_positive(self.get(raw, "page"), 1);
        let mut limit = coerce_positive(self.get(raw, "limit"), self.default_limit);
        if let Some(max) = self.max_limit {
            if limit > max {
                if self.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                }
                limit = max.max(1);
            }
        }

        let plan = QueryPlan { filter, sort_keys, selected_fields, page, limit };
        if self.debug_logging {
            tracing::debug!(?plan, "translated query");
        }
        plan
    }

    fn get<'a>(&self, raw: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
        if !self.reserved.iter().any(|r| r == key) {
            return None;
        }
        raw.get(key).map(String::as_str)
    }

    /// `field[op]=value` becomes a typed comparison; anything else is equality on the key.
    fn predicate(key: &str, value: &str) -> Predicate {
        match split_operator(key) {
            Some((field, FilterOp::In)) => Predicate::In(
                field.to_string(),
                value.split(',').map(|v| typed_value(v.trim())).collect(),
            ),
            Some((field, op)) => Predicate::new(field, op, typed_value(value)),
            None => Predicate::Eq(key.to_string(), typed_value(value)),
        }
    }
}

fn split_operator(key: &str) -> Option<(&str, FilterOp)> {
    let inner = key.strip_suffix(']')?;
    let (field, token) = inner.rsplit_once('[')?;
    if field.is_empty() {
        return None;
    }
    FilterOp::from_token(token).map(|op| (field, op))
}

/// Leading-integer parse: optional sign then digits, trailing garbage ignored.
fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let n = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -n } else { n })
}

fn coerce_positive(raw: Option<&str>, default: u64) -> u64 {
    match raw.and_then(parse_int) {
        None | Some(0) => default,
        Some(n) if n < 0 => 1,
        Some(n) => n as u64,
    }
}
