//! `SeaORM` binding for the query-scoping engine.
//!
//! The core crate parses and validates; this crate compiles the accepted
//! specs against a concrete entity (descriptor, condition compiler, row
//! materialization) and runs the whole thing as one pipeline.

pub mod condition;
pub mod descriptor;
pub mod pipeline;
pub mod project;

pub use condition::{ScopeBuildError, apply_sort, filter_condition};
pub use descriptor::{
    AttachmentResolver, Field, FieldKind, FieldMap, NestedDef, NestedKind, NestedLoader,
    ScopeDescriptor,
};
pub use pipeline::{ListEnvelope, PipelineError, ScopeOutcome, ScopePipeline};
pub use project::{ProjectionError, shape_rows};
