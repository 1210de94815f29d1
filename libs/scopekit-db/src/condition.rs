//! Filter/sort specs → `sea_orm` query fragments (specs in, SQL out).
//! Parsing and validation belong to the core crate; this module only
//! compiles already-accepted specs.

use sea_orm::sea_query::{Expr, Func, Order};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryOrder, Select};
use thiserror::Error;

use scopekit::filter::{FilterOp, FilterSet, FilterValue};
use scopekit::sort::{SortDir, SortSpec};

use crate::descriptor::{FieldKind, FieldMap};

#[derive(Debug, Error, Clone)]
pub enum ScopeBuildError {
    /// A validated field name has no column mapping. Indicates a descriptor
    /// whose allowlists and field map disagree.
    #[error("field not present in field map: {0}")]
    UnmappedField(String),
}

/// Coerce a raw parameter string into a typed value for the column.
///
/// Coercion failures fall back to the string value; comparisons then behave
/// like the underlying database comparing mismatched types, rather than
/// failing the whole request on one bad literal.
fn coerce(kind: FieldKind, raw: &str) -> sea_orm::Value {
    use sea_orm::Value as V;

    match kind {
        FieldKind::String => V::String(Some(Box::new(raw.to_owned()))),
        FieldKind::I64 => raw
            .parse::<i64>()
            .map_or_else(|_| V::String(Some(Box::new(raw.to_owned()))), |i| {
                V::BigInt(Some(i))
            }),
        FieldKind::F64 => raw
            .parse::<f64>()
            .map_or_else(|_| V::String(Some(Box::new(raw.to_owned()))), |f| {
                V::Double(Some(f))
            }),
        FieldKind::Bool => raw
            .parse::<bool>()
            .map_or_else(|_| V::String(Some(Box::new(raw.to_owned()))), |b| {
                V::Bool(Some(b))
            }),
        FieldKind::Uuid => raw.parse::<uuid::Uuid>().map_or_else(
            |_| V::String(Some(Box::new(raw.to_owned()))),
            |u| V::Uuid(Some(Box::new(u))),
        ),
        FieldKind::DateTimeUtc => chrono::DateTime::parse_from_rfc3339(raw).map_or_else(
            |_| V::String(Some(Box::new(raw.to_owned()))),
            |dt| V::ChronoDateTimeUtc(Some(Box::new(dt.with_timezone(&chrono::Utc)))),
        ),
    }
}

/// Compile an accepted filter set into one AND-combined condition.
///
/// Groups compile in the fixed operator order the set iterates in. LIKE
/// compares lower-cased on both sides so matching stays case-insensitive
/// across backends; IN with an empty list compiles to `1=0`.
///
/// # Errors
/// Returns [`ScopeBuildError::UnmappedField`] when a predicate names a field
/// the map does not carry.
pub fn filter_condition<E>(set: &FilterSet, fields: &FieldMap<E>) -> Result<Condition, ScopeBuildError>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let mut condition = Condition::all();
    for (op, predicates) in set.groups() {
        for predicate in predicates {
            let field = fields
                .get(&predicate.field)
                .ok_or_else(|| ScopeBuildError::UnmappedField(predicate.field.clone()))?;
            let sub = match (op, &predicate.value) {
                (FilterOp::Equal, FilterValue::Scalar(v)) => {
                    Condition::all().add(Expr::col(field.col).eq(coerce(field.kind, v)))
                }
                (FilterOp::BiggerThan, FilterValue::Scalar(v)) => {
                    Condition::all().add(Expr::col(field.col).gt(coerce(field.kind, v)))
                }
                (FilterOp::LessThan, FilterValue::Scalar(v)) => {
                    Condition::all().add(Expr::col(field.col).lt(coerce(field.kind, v)))
                }
                (FilterOp::BiggerThanOrEqualTo, FilterValue::Scalar(v)) => {
                    Condition::all().add(Expr::col(field.col).gte(coerce(field.kind, v)))
                }
                (FilterOp::LessThanOrEqualTo, FilterValue::Scalar(v)) => {
                    Condition::all().add(Expr::col(field.col).lte(coerce(field.kind, v)))
                }
                (FilterOp::Like, FilterValue::Pattern(pattern)) => Condition::all().add(
                    Expr::expr(Func::lower(Expr::col(field.col))).like(pattern.to_lowercase()),
                ),
                (FilterOp::In, FilterValue::List(items)) => {
                    if items.is_empty() {
                        Condition::all().add(Expr::cust("1=0"))
                    } else {
                        let values: Vec<sea_orm::Value> =
                            items.iter().map(|item| coerce(field.kind, item)).collect();
                        Condition::all().add(Expr::col(field.col).is_in(values))
                    }
                }
                // Parsing guarantees the operator/value pairing.
                _ => continue,
            };
            condition = condition.add(sub);
        }
    }
    Ok(condition)
}

/// Apply an accepted sort spec, in supply order, to a select.
///
/// # Errors
/// Returns [`ScopeBuildError::UnmappedField`] when a sort key names a field
/// the map does not carry.
pub fn apply_sort<E>(
    select: Select<E>,
    spec: &SortSpec,
    fields: &FieldMap<E>,
) -> Result<Select<E>, ScopeBuildError>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let mut query = select;
    for key in &spec.0 {
        let field = fields
            .get(&key.field)
            .ok_or_else(|| ScopeBuildError::UnmappedField(key.field.clone()))?;
        let order = match key.dir {
            SortDir::Asc => Order::Asc,
            SortDir::Desc => Order::Desc,
        };
        query = query.order_by(field.col, order);
    }
    Ok(query)
}
