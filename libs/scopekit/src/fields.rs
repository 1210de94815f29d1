//! Field projection: which scalar fields, nested associations and attachment
//! fields a response may include.
//!
//! Scalar and nested rejects aggregate into one error (nested first);
//! attachment rejects report separately.

use std::collections::BTreeSet;

use serde_json::json;

use crate::context::RequestContext;
use crate::errors::ScopeError;

/// Message for rejected scalar/nested selections.
pub const SELECTED_NOT_ALLOWED: &str = "Selected not allowed fields";
/// Message for rejected attachment selections.
pub const SELECTED_NOT_ALLOWED_ATTACHMENTS: &str = "Selected not allowed attachment fields";

/// Borrowed view of an entity's selectable-field configuration.
#[derive(Debug, Clone, Copy)]
pub struct FieldCatalog<'a> {
    /// All scalar attribute names, in declared order.
    pub attributes: &'a [String],
    /// Entity-declared default whitelist (`MODEL_FIELDS_SELECT`); may be empty.
    pub model_fields_select: &'a [String],
    /// Attributes never selectable (`UNALLOWED_MODEL_FIELDS_SELECT`).
    pub unallowed: &'a BTreeSet<String>,
    /// Selectable nested association names (`NESTED_SELECTABLE_FIELDS` keys).
    pub nested: &'a BTreeSet<String>,
    /// Attachment field names from entity reflection.
    pub attachments: &'a BTreeSet<String>,
}

/// Resolved projection: what actually gets selected, loaded and overlaid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionSpec {
    pub scalar: Vec<String>,
    pub nested: Vec<String>,
    pub attachments: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ParsedProjection {
    pub spec: ProjectionSpec,
    /// Nested rejects followed by scalar rejects, as one error body.
    pub rejected_fields: Vec<String>,
    pub rejected_attachments: Vec<String>,
}

impl ParsedProjection {
    #[must_use]
    pub fn fields_error(&self) -> Option<ScopeError> {
        if self.rejected_fields.is_empty() {
            None
        } else {
            Some(ScopeError::new(
                SELECTED_NOT_ALLOWED,
                json!(self.rejected_fields),
            ))
        }
    }

    #[must_use]
    pub fn attachments_error(&self) -> Option<ScopeError> {
        if self.rejected_attachments.is_empty() {
            None
        } else {
            Some(ScopeError::new(
                SELECTED_NOT_ALLOWED_ATTACHMENTS,
                json!(self.rejected_attachments),
            ))
        }
    }
}

fn split_csv(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Compute the projection from `fields_select`, `nested_fields_select` and
/// `attachment_fields_select` parameters.
///
/// Scalar selection: when `fields_select` is present, the effective set is
/// the union of the entity's default whitelist and the accepted requested
/// names; when absent, all attributes minus the blacklist. An effective set
/// that resolves empty (blank `fields_select` with no declared whitelist)
/// also falls back to attributes minus the blacklist. Rejections are
/// aggregated, not first-match.
#[must_use]
pub fn compute(ctx: &RequestContext, catalog: &FieldCatalog<'_>) -> ParsedProjection {
    let mut parsed = ParsedProjection::default();

    let allowed: BTreeSet<&str> = catalog
        .attributes
        .iter()
        .map(String::as_str)
        .filter(|name| !catalog.unallowed.contains(*name))
        .collect();

    let defaults = || {
        catalog
            .attributes
            .iter()
            .filter(|name| !catalog.unallowed.contains(*name))
            .cloned()
            .collect::<Vec<_>>()
    };

    let mut rejected_scalars = Vec::new();
    match ctx.query().get("fields_select") {
        Some(raw) => {
            let mut selected: Vec<String> = catalog.model_fields_select.to_vec();
            for name in split_csv(raw) {
                if allowed.contains(name) {
                    if !selected.iter().any(|s| s == name) {
                        selected.push(name.to_owned());
                    }
                } else {
                    rejected_scalars.push(name.to_owned());
                }
            }
            // Zero selected columns cannot be what the client meant.
            if selected.is_empty() {
                selected = defaults();
            }
            parsed.spec.scalar = selected;
        }
        None => {
            parsed.spec.scalar = defaults();
        }
    }

    if let Some(raw) = ctx.query().get("nested_fields_select") {
        for name in split_csv(raw) {
            if catalog.nested.contains(name) {
                parsed.spec.nested.push(name.to_owned());
            } else {
                parsed.rejected_fields.push(name.to_owned());
            }
        }
    }
    // Nested rejects come first in the shared error body.
    parsed.rejected_fields.extend(rejected_scalars);

    if let Some(raw) = ctx.query().get("attachment_fields_select") {
        for name in split_csv(raw) {
            if catalog.attachments.contains(name) {
                parsed.spec.attachments.push(name.to_owned());
            } else {
                parsed.rejected_attachments.push(name.to_owned());
            }
        }
    }

    if !parsed.rejected_fields.is_empty() || !parsed.rejected_attachments.is_empty() {
        tracing::debug!(
            fields = ?parsed.rejected_fields,
            attachments = ?parsed.rejected_attachments,
            "rejected projection selections"
        );
    }
    parsed
}
