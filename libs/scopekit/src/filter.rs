//! Filter parsing: suffix-matched query keys → typed, allowlisted predicate
//! groups.
//!
//! A query key participates in filtering when it ends with one of the seven
//! operator suffixes. Suffix detection walks the declared operator order and
//! uses anchored (full-suffix) matching, so `_bigger_than` can never shadow
//! `_bigger_than_or_equal_to`. Keys without a recognized suffix are ignored
//! entirely; keys whose stripped field is outside the allowlist are collected
//! and reported in aggregate.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::json;

use crate::context::RequestContext;
use crate::errors::ScopeError;

/// Message for the aggregated unknown-filter-keys error.
pub const UNKNOWN_FILTER_FIELDS: &str = "Unknown Filter Fields";
/// Message for the execution-time id-equality miss.
pub const RECORD_NOT_FOUND: &str = "Record not found";

/// Filter operators, declared in both suffix-detection priority order and
/// predicate application order (the derived `Ord` drives the latter through
/// the `BTreeMap` of groups).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterOp {
    Equal,
    Like,
    BiggerThan,
    LessThan,
    BiggerThanOrEqualTo,
    LessThanOrEqualTo,
    In,
}

impl FilterOp {
    pub const ALL: [FilterOp; 7] = [
        FilterOp::Equal,
        FilterOp::Like,
        FilterOp::BiggerThan,
        FilterOp::LessThan,
        FilterOp::BiggerThanOrEqualTo,
        FilterOp::LessThanOrEqualTo,
        FilterOp::In,
    ];

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            FilterOp::Equal => "_equal",
            FilterOp::Like => "_like",
            FilterOp::BiggerThan => "_bigger_than",
            FilterOp::LessThan => "_less_than",
            FilterOp::BiggerThanOrEqualTo => "_bigger_than_or_equal_to",
            FilterOp::LessThanOrEqualTo => "_less_than_or_equal_to",
            FilterOp::In => "_in",
        }
    }

    /// Split a query key into (operator, field name), or `None` when the key
    /// carries no operator suffix. First anchored match in declared order.
    #[must_use]
    pub fn match_key(key: &str) -> Option<(FilterOp, &str)> {
        for op in Self::ALL {
            if let Some(field) = key.strip_suffix(op.suffix()) {
                if !field.is_empty() {
                    return Some((op, field));
                }
            }
        }
        None
    }
}

/// Value carried by a predicate, already transformed per its operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Raw scalar; type coercion is deferred to the store binding.
    Scalar(String),
    /// `%...%`-wrapped pattern with LIKE metacharacters escaped.
    Pattern(String),
    /// Comma-split, whitespace-trimmed element list; empty elements dropped.
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    pub field: String,
    pub value: FilterValue,
}

/// Accepted predicates grouped by operator. Iteration yields groups in the
/// fixed application order; within a group a field appears at most once
/// (last parsed value wins).
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    groups: BTreeMap<FilterOp, Vec<FilterPredicate>>,
}

impl FilterSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = (FilterOp, &[FilterPredicate])> {
        self.groups.iter().map(|(op, preds)| (*op, preds.as_slice()))
    }

    /// The raw value of an `id` equality predicate, when one exists
    /// (explicit `id_equal` or synthesized from the record id).
    #[must_use]
    pub fn id_equal(&self) -> Option<&str> {
        self.groups.get(&FilterOp::Equal)?.iter().find_map(|p| {
            if p.field == "id" {
                match &p.value {
                    FilterValue::Scalar(v) => Some(v.as_str()),
                    _ => None,
                }
            } else {
                None
            }
        })
    }

    fn push(&mut self, op: FilterOp, field: &str, value: FilterValue) {
        let group = self.groups.entry(op).or_default();
        if let Some(existing) = group.iter_mut().find(|p| p.field == field) {
            existing.value = value;
        } else {
            group.push(FilterPredicate {
                field: field.to_owned(),
                value,
            });
        }
    }
}

/// Outcome of filter parsing: the accepted predicate set plus the verbatim
/// query keys whose field failed the allowlist.
#[derive(Debug, Default)]
pub struct ParsedFilters {
    pub set: FilterSet,
    pub rejected: Vec<String>,
}

impl ParsedFilters {
    /// Aggregated "Unknown Filter Fields" error, if any key was rejected.
    #[must_use]
    pub fn error(&self) -> Option<ScopeError> {
        if self.rejected.is_empty() {
            None
        } else {
            Some(ScopeError::new(UNKNOWN_FILTER_FIELDS, json!(self.rejected)))
        }
    }
}

/// Escape LIKE metacharacters so user input cannot inject wildcards.
fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

/// Parse the request's filter parameters against the entity's
/// `FILTERABLE_FIELDS` allowlist (`id` is always filterable).
///
/// A record id on the context synthesizes an implicit `id_equal` predicate
/// before any query key is examined, so a raw `id` route/body parameter never
/// reports as an unknown field.
#[must_use]
pub fn parse(ctx: &RequestContext, filterable: &BTreeSet<String>) -> ParsedFilters {
    let mut parsed = ParsedFilters::default();

    if let Some(id) = ctx.record_id() {
        parsed
            .set
            .push(FilterOp::Equal, "id", FilterValue::Scalar(id.to_owned()));
    }

    for (key, value) in ctx.query().iter() {
        let Some((op, field)) = FilterOp::match_key(key) else {
            continue;
        };
        if field != "id" && !filterable.contains(field) {
            parsed.rejected.push(key.to_owned());
            continue;
        }
        match op {
            FilterOp::Like => {
                // An empty pattern would match everything; drop it.
                if value.is_empty() {
                    continue;
                }
                let pattern = format!("%{}%", like_escape(value));
                parsed.set.push(op, field, FilterValue::Pattern(pattern));
            }
            FilterOp::In => {
                let items = value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(ToOwned::to_owned)
                    .collect();
                parsed.set.push(op, field, FilterValue::List(items));
            }
            _ => parsed
                .set
                .push(op, field, FilterValue::Scalar(value.to_owned())),
        }
    }

    if !parsed.rejected.is_empty() {
        tracing::debug!(rejected = ?parsed.rejected, "unknown filter fields");
    }
    parsed
}

/// Build the execution-time "Record not found" error for a missed
/// id-equality filter. The id keeps its numeric JSON shape when it parses as
/// an integer.
#[must_use]
pub fn record_not_found(id: &str) -> ScopeError {
    let id_value = id
        .parse::<i64>()
        .map_or_else(|_| json!(id), |n| json!(n));
    ScopeError::new(RECORD_NOT_FOUND, json!({ "id": id_value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Action, QueryParams, RequestContext};
    use http::Method;

    fn allow(fields: &[&str]) -> BTreeSet<String> {
        fields.iter().map(|f| (*f).to_owned()).collect()
    }

    fn ctx(pairs: &[(&str, &str)]) -> RequestContext {
        RequestContext::new(
            Method::GET,
            Action::Index,
            QueryParams::from_pairs(pairs.iter().copied()),
        )
    }

    #[test]
    fn suffix_detection_is_anchored() {
        assert_eq!(
            FilterOp::match_key("price_bigger_than"),
            Some((FilterOp::BiggerThan, "price"))
        );
        assert_eq!(
            FilterOp::match_key("price_bigger_than_or_equal_to"),
            Some((FilterOp::BiggerThanOrEqualTo, "price"))
        );
        assert_eq!(
            FilterOp::match_key("price_less_than_or_equal_to"),
            Some((FilterOp::LessThanOrEqualTo, "price"))
        );
    }

    #[test]
    fn unsuffixed_keys_are_ignored_entirely() {
        let parsed = parse(&ctx(&[("page", "1"), ("name", "x")]), &allow(&["name"]));
        assert!(parsed.set.is_empty());
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn bare_suffix_key_is_not_a_filter() {
        assert_eq!(FilterOp::match_key("_equal"), None);
        assert_eq!(FilterOp::match_key("_in"), None);
    }

    #[test]
    fn unknown_field_rejected_with_verbatim_key() {
        let parsed = parse(&ctx(&[("code_equal", "X")]), &allow(&["name"]));
        assert!(parsed.set.is_empty());
        assert_eq!(parsed.rejected, vec!["code_equal"]);
        let err = parsed.error().unwrap();
        assert_eq!(err.message, UNKNOWN_FILTER_FIELDS);
        assert_eq!(err.body, json!(["code_equal"]));
    }

    #[test]
    fn id_is_always_filterable() {
        let parsed = parse(&ctx(&[("id_equal", "7")]), &allow(&[]));
        assert!(parsed.rejected.is_empty());
        assert_eq!(parsed.set.id_equal(), Some("7"));
    }

    #[test]
    fn record_id_synthesizes_id_equal() {
        let ctx = RequestContext::new(Method::GET, Action::Show, QueryParams::new())
            .with_record_id("42");
        let parsed = parse(&ctx, &allow(&[]));
        assert_eq!(parsed.set.id_equal(), Some("42"));
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn explicit_id_equal_wins_over_synthesized() {
        let ctx = RequestContext::new(
            Method::GET,
            Action::Show,
            QueryParams::from_pairs([("id_equal", "9")]),
        )
        .with_record_id("42");
        let parsed = parse(&ctx, &allow(&[]));
        assert_eq!(parsed.set.id_equal(), Some("9"));
    }

    #[test]
    fn like_wraps_and_escapes() {
        let parsed = parse(&ctx(&[("name_like", "50%_off")]), &allow(&["name"]));
        let (_, preds) = parsed.set.groups().next().unwrap();
        assert_eq!(
            preds[0].value,
            FilterValue::Pattern("%50\\%\\_off%".to_owned())
        );
    }

    #[test]
    fn empty_like_value_is_dropped() {
        let parsed = parse(&ctx(&[("name_like", "")]), &allow(&["name"]));
        assert!(parsed.set.is_empty());
    }

    #[test]
    fn in_splits_and_trims() {
        let parsed = parse(&ctx(&[("name_in", "a, b ,c")]), &allow(&["name"]));
        let (op, preds) = parsed.set.groups().next().unwrap();
        assert_eq!(op, FilterOp::In);
        assert_eq!(
            preds[0].value,
            FilterValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn in_drops_empty_elements() {
        let parsed = parse(&ctx(&[("name_in", "a,,")]), &allow(&["name"]));
        let (_, preds) = parsed.set.groups().next().unwrap();
        assert_eq!(preds[0].value, FilterValue::List(vec!["a".into()]));

        let parsed = parse(&ctx(&[("name_in", "")]), &allow(&["name"]));
        let (_, preds) = parsed.set.groups().next().unwrap();
        assert_eq!(preds[0].value, FilterValue::List(Vec::new()));
    }

    #[test]
    fn groups_iterate_in_application_order() {
        let parsed = parse(
            &ctx(&[
                ("name_in", "a,b"),
                ("price_less_than", "9"),
                ("name_like", "foo"),
                ("name_equal", "bar"),
            ]),
            &allow(&["name", "price"]),
        );
        let ops: Vec<_> = parsed.set.groups().map(|(op, _)| op).collect();
        assert_eq!(
            ops,
            vec![
                FilterOp::Equal,
                FilterOp::Like,
                FilterOp::LessThan,
                FilterOp::In
            ]
        );
    }

    #[test]
    fn not_found_body_keeps_numeric_id() {
        let err = record_not_found("99999");
        assert_eq!(err.body, json!({"id": 99999}));
        let err = record_not_found("abc");
        assert_eq!(err.body, json!({"id": "abc"}));
    }
}
