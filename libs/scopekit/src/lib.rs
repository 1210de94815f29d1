//! Query-scoping engine core.
//!
//! Turns HTTP query-string parameters into validated filter, sort, pagination
//! and projection specifications, gated by a role-based authorization check.
//! This crate is store-independent: it parses and validates; a store binding
//! (see `scopekit-db`) compiles the resulting specs into actual queries.
pub mod authz;
pub mod config;
pub mod context;
pub mod errors;
pub mod fields;
pub mod filter;
pub mod page;
pub mod roles;
pub mod sort;

pub use authz::AllowedRolesActions;
pub use config::ScopeConfig;
pub use context::{Action, QueryParams, RequestContext};
pub use errors::{ErrorCollector, ScopeError, Status};
pub use fields::ProjectionSpec;
pub use filter::{FilterOp, FilterPredicate, FilterSet, FilterValue};
pub use page::{PageMeta, PageSpec};
pub use roles::{Principal, Role, RoleAttr, RoleSet};
pub use sort::{SortDir, SortKey, SortSpec};
