//! Request-scoped pipeline: authorize, validate every stage, then compile
//! and execute the scoped query.

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use scopekit::context::{Action, RequestContext};
use scopekit::errors::{ErrorCollector, ScopeError, Status};
use scopekit::page::PageMeta;
use scopekit::roles::Principal;
use scopekit::{authz, fields, filter, page, roles, sort};

use crate::condition::{ScopeBuildError, apply_sort, filter_condition};
use crate::descriptor::ScopeDescriptor;
use crate::project::{ProjectionError, shape_rows};

/// Message for a projection that dropped an attribute execution requires.
pub const MISSING_ATTRIBUTE: &str = "Missing required attribute";

/// Infrastructure failures. User-facing validation outcomes never surface
/// here; they come back as [`ScopeOutcome::Failure`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Build(#[from] ScopeBuildError),

    #[error(transparent)]
    Projection(ProjectionError),
}

/// List response envelope: the page of shaped objects plus its pagination
/// metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEnvelope {
    pub objects: Vec<Value>,
    pub pagination: PageMeta,
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeOutcome {
    List(ListEnvelope),
    Record(Value),
    Failure {
        errors: Vec<ScopeError>,
        status: Status,
    },
}

impl ScopeOutcome {
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            ScopeOutcome::List(_) | ScopeOutcome::Record(_) => Status::Ok,
            ScopeOutcome::Failure { status, .. } => *status,
        }
    }

    fn failure(error: ScopeError, status: Status) -> Self {
        ScopeOutcome::Failure {
            errors: vec![error],
            status,
        }
    }
}

/// One entity's scoping pipeline, bound to a connection and descriptor.
/// Cheap to construct per request.
pub struct ScopePipeline<'a, E: EntityTrait> {
    db: &'a DatabaseConnection,
    descriptor: &'a ScopeDescriptor<E>,
    config: scopekit::ScopeConfig,
}

impl<'a, E> ScopePipeline<'a, E>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
    E::Model: Send + Sync,
{
    pub fn new(
        db: &'a DatabaseConnection,
        descriptor: &'a ScopeDescriptor<E>,
        config: scopekit::ScopeConfig,
    ) -> Self {
        Self {
            db,
            descriptor,
            config,
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// The authorization gate short-circuits everything. Validation then
    /// runs every stage in the fixed order pagination, sort, filter, scalar
    /// and nested fields, attachments; any rejection aggregates into one
    /// `Failure` and skips execution entirely. A clean validation pass
    /// compiles the specs, counts the scope, checks an id-equality miss,
    /// fetches the page and shapes its rows.
    ///
    /// # Errors
    /// Only infrastructure failures (database errors, descriptor
    /// misconfiguration) return `Err`; every user-facing outcome is an
    /// `Ok(ScopeOutcome)`.
    #[tracing::instrument(skip_all, fields(action = ctx.action().as_str()))]
    pub async fn run(
        &self,
        ctx: &RequestContext,
        principal: Option<&dyn Principal>,
    ) -> Result<ScopeOutcome, PipelineError> {
        let role_set = roles::resolve(principal);
        if let Err(error) = authz::authorize(
            principal.is_some(),
            &role_set,
            ctx.action(),
            self.descriptor.allowed_roles_actions(),
        ) {
            return Ok(ScopeOutcome::failure(error, Status::Forbidden));
        }

        let paged = page::compute(ctx, &self.config);
        let sorted = sort::parse(ctx, self.descriptor.sortable_fields());
        let filters = filter::parse(ctx, self.descriptor.filterable_fields());
        let projection = fields::compute(ctx, &self.descriptor.catalog());

        let mut collector = ErrorCollector::new();
        if let Some(error) = paged.error.clone() {
            collector.push(error, Status::BadRequest);
        }
        if let Some(error) = sorted.error() {
            collector.push(error, Status::BadRequest);
        }
        if let Some(error) = filters.error() {
            collector.push(error, Status::BadRequest);
        }
        if let Some(error) = projection.fields_error() {
            collector.push(error, Status::BadRequest);
        }
        if let Some(error) = projection.attachments_error() {
            collector.push(error, Status::BadRequest);
        }
        if !collector.is_empty() {
            let (errors, status) = collector.into_parts();
            return Ok(ScopeOutcome::Failure { errors, status });
        }

        let mut select = E::find();
        if principal.is_some() {
            select = select.filter(self.descriptor.base_scope(&role_set));
        }
        select = select.filter(filter_condition(&filters.set, self.descriptor.fields())?);

        // One count serves both the envelope and the not-found check.
        let total_items = select.clone().count(self.db).await?;

        if let Some(id) = filters.set.id_equal() {
            if total_items == 0 {
                return Ok(ScopeOutcome::failure(
                    filter::record_not_found(id),
                    Status::NotFound,
                ));
            }
        }

        select = apply_sort(select, &sorted.spec, self.descriptor.fields())?;
        let spec = paged.spec;
        let rows = select
            .offset(spec.offset())
            .limit(spec.per_page)
            .into_json()
            .all(self.db)
            .await?;
        let fetched = rows.len();

        let shaped = match shape_rows(self.db, self.descriptor, &projection.spec, rows).await {
            Ok(shaped) => shaped,
            Err(ProjectionError::MissingAttribute(attribute)) => {
                return Ok(ScopeOutcome::failure(
                    ScopeError::new(MISSING_ATTRIBUTE, json!({ "attribute": attribute })),
                    Status::Unprocessable,
                ));
            }
            Err(ProjectionError::Db(error)) => return Err(PipelineError::Db(error)),
            Err(error) => return Err(PipelineError::Projection(error)),
        };

        tracing::debug!(total_items, fetched, "scope executed");

        if ctx.action() == Action::Show {
            // The miss body carries the requested id, null when the request
            // never named one.
            let not_found = filters.set.id_equal().map_or_else(
                || ScopeError::new(filter::RECORD_NOT_FOUND, json!({ "id": Value::Null })),
                filter::record_not_found,
            );
            return Ok(shaped.into_iter().next().map_or_else(
                || ScopeOutcome::failure(not_found, Status::NotFound),
                ScopeOutcome::Record,
            ));
        }

        Ok(ScopeOutcome::List(ListEnvelope {
            objects: shaped,
            pagination: PageMeta {
                page: spec.page,
                pages: spec.pages(total_items),
                total_items,
            },
        }))
    }
}
