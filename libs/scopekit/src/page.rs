//! Pagination: page/offset/limit computation and the page-size ceiling check.

use serde::Serialize;
use serde_json::json;

use crate::config::ScopeConfig;
use crate::context::RequestContext;
use crate::errors::ScopeError;

/// Message for a `per_page` value above the configured ceiling.
pub const INVALID_PER_PAGE: &str = "Invalid per page value";

/// Validated page/size pair. `page` is always ≥ 1 and `per_page` ≥ 1, so the
/// offset can never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: u64,
    pub per_page: u64,
}

impl PageSpec {
    #[must_use]
    pub fn offset(self) -> u64 {
        (self.page - 1) * self.per_page
    }

    /// Total page count for the given item count; zero items mean zero pages.
    #[must_use]
    pub fn pages(self, total_items: u64) -> u64 {
        if total_items == 0 {
            0
        } else {
            total_items.div_ceil(self.per_page)
        }
    }
}

/// Pagination section of the list response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub pages: u64,
    pub total_items: u64,
}

#[derive(Debug)]
pub struct ParsedPage {
    pub spec: PageSpec,
    pub error: Option<ScopeError>,
}

fn coerce(raw: Option<&str>, default: u64) -> i64 {
    match raw {
        Some(v) => v.parse::<i64>().unwrap_or(default as i64),
        None => default as i64,
    }
}

/// Compute the pagination spec from `page`/`per_page` parameters.
///
/// Values that fail integer coercion fall back to the configured defaults;
/// `page < 1` clamps to 1 and `per_page < 1` clamps to 1. A requested
/// `per_page` above the ceiling still yields a spec (the pipeline skips
/// execution on the reported error anyway) with the body
/// `{"per_page_max_value": max}`.
#[must_use]
pub fn compute(ctx: &RequestContext, cfg: &ScopeConfig) -> ParsedPage {
    let page = coerce(ctx.query().get("page"), cfg.default_page).max(1) as u64;
    let per_page_requested = coerce(ctx.query().get("per_page"), cfg.default_per_page);

    let error = if per_page_requested > cfg.max_per_page as i64 {
        Some(ScopeError::new(
            INVALID_PER_PAGE,
            json!({ "per_page_max_value": cfg.max_per_page }),
        ))
    } else {
        None
    };

    let per_page = per_page_requested.max(1) as u64;
    ParsedPage {
        spec: PageSpec { page, per_page },
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Action, QueryParams, RequestContext};
    use http::Method;

    fn ctx(pairs: &[(&str, &str)]) -> RequestContext {
        RequestContext::new(
            Method::GET,
            Action::Index,
            QueryParams::from_pairs(pairs.iter().copied()),
        )
    }

    #[test]
    fn defaults_apply_when_absent() {
        let parsed = compute(&ctx(&[]), &ScopeConfig::default());
        assert_eq!(parsed.spec, PageSpec { page: 1, per_page: 12 });
        assert!(parsed.error.is_none());
    }

    #[test]
    fn offset_follows_page() {
        let parsed = compute(&ctx(&[("page", "3"), ("per_page", "10")]), &ScopeConfig::default());
        assert_eq!(parsed.spec.offset(), 20);
    }

    #[test]
    fn page_below_one_clamps() {
        let parsed = compute(&ctx(&[("page", "0")]), &ScopeConfig::default());
        assert_eq!(parsed.spec.page, 1);
        assert_eq!(parsed.spec.offset(), 0);
        let parsed = compute(&ctx(&[("page", "-4")]), &ScopeConfig::default());
        assert_eq!(parsed.spec.page, 1);
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let parsed = compute(&ctx(&[("page", "x"), ("per_page", "y")]), &ScopeConfig::default());
        assert_eq!(parsed.spec, PageSpec { page: 1, per_page: 12 });
    }

    #[test]
    fn per_page_over_ceiling_is_an_error() {
        let parsed = compute(&ctx(&[("per_page", "101")]), &ScopeConfig::default());
        let err = parsed.error.unwrap();
        assert_eq!(err.message, INVALID_PER_PAGE);
        assert_eq!(err.body, json!({"per_page_max_value": 100}));
    }

    #[test]
    fn per_page_at_ceiling_is_fine() {
        let parsed = compute(&ctx(&[("per_page", "100")]), &ScopeConfig::default());
        assert!(parsed.error.is_none());
        assert_eq!(parsed.spec.per_page, 100);
    }

    #[test]
    fn pages_is_ceiling_division() {
        let spec = PageSpec { page: 1, per_page: 12 };
        assert_eq!(spec.pages(0), 0);
        assert_eq!(spec.pages(1), 1);
        assert_eq!(spec.pages(12), 1);
        assert_eq!(spec.pages(13), 2);
        assert_eq!(spec.pages(24), 2);
    }
}
