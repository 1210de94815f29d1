//! Sort parsing: `_sort`-suffixed query keys → an ordered, allowlisted
//! ordering list.

use std::collections::BTreeSet;

use serde_json::json;

use crate::context::RequestContext;
use crate::errors::ScopeError;

/// Message for the aggregated unknown-sort-fields error.
pub const UNKNOWN_SORT: &str = "Unknown Sort";

const SORT_SUFFIX: &str = "_sort";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

/// Ordering directives in parameter supply order.
#[derive(Debug, Clone, Default)]
pub struct SortSpec(pub Vec<SortKey>);

impl SortSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ParsedSort {
    pub spec: SortSpec,
    /// Stripped field names (not full keys) that failed the allowlist.
    pub rejected: Vec<String>,
}

impl ParsedSort {
    #[must_use]
    pub fn error(&self) -> Option<ScopeError> {
        if self.rejected.is_empty() {
            None
        } else {
            Some(ScopeError::new(UNKNOWN_SORT, json!(self.rejected)))
        }
    }
}

/// Parse sort parameters against the entity's `SORTABLE_FIELDS` allowlist
/// (`id` is always sortable). Applies only to reads; any non-GET request
/// yields an empty spec. Direction is the lower-cased value when it is
/// exactly `asc` or `desc`, `asc` otherwise.
#[must_use]
pub fn parse(ctx: &RequestContext, sortable: &BTreeSet<String>) -> ParsedSort {
    let mut parsed = ParsedSort::default();
    if !ctx.is_read() {
        return parsed;
    }

    for (key, value) in ctx.query().iter() {
        let Some(field) = key.strip_suffix(SORT_SUFFIX) else {
            continue;
        };
        if field.is_empty() {
            continue;
        }
        if field != "id" && !sortable.contains(field) {
            parsed.rejected.push(field.to_owned());
            continue;
        }
        let dir = match value.to_lowercase().as_str() {
            "desc" => SortDir::Desc,
            _ => SortDir::Asc,
        };
        parsed.spec.0.push(SortKey {
            field: field.to_owned(),
            dir,
        });
    }

    if !parsed.rejected.is_empty() {
        tracing::debug!(rejected = ?parsed.rejected, "unknown sort fields");
    }
    parsed
}
