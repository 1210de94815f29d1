//! Per-entity scoping descriptor: field map, allowlists, nested loaders,
//! attachment resolvers, authorization rules and the role-scope registry.
//!
//! One descriptor is built per entity at boot and shared by every request.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{Condition, DatabaseConnection, DbErr, EntityTrait};
use serde_json::Value as JsonValue;

use scopekit::authz::AllowedRolesActions;
use scopekit::fields::FieldCatalog;
use scopekit::roles::{Role, RoleSet};

/// Logical type of a mapped column, used to coerce raw parameter strings
/// into typed `sea_orm::Value`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
}

#[derive(Clone)]
pub struct Field<E: EntityTrait> {
    pub col: E::Column,
    pub kind: FieldKind,
}

/// API field name → entity column mapping, keyed case-insensitively.
/// Insertion order is preserved; it defines the attribute order seen by
/// field projection.
#[derive(Clone)]
#[must_use]
pub struct FieldMap<E: EntityTrait> {
    map: HashMap<String, Field<E>>,
    names: Vec<String>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> FieldMap<E> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            names: Vec::new(),
        }
    }

    pub fn insert(mut self, api_name: impl Into<String>, col: E::Column, kind: FieldKind) -> Self {
        let api_name = api_name.into().to_lowercase();
        if !self.map.contains_key(&api_name) {
            self.names.push(api_name.clone());
        }
        self.map.insert(api_name, Field { col, kind });
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.map.get(&name.to_lowercase())
    }

    /// Attribute names in insertion order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Cardinality of a nested association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedKind {
    One,
    Many,
}

/// Batch loader for one nested association.
///
/// Receives the foreign-key values of every row on the current page and
/// returns related rows grouped by key, so a page materializes with one
/// related query instead of one per row.
#[async_trait::async_trait]
pub trait NestedLoader: Send + Sync {
    async fn load(
        &self,
        db: &DatabaseConnection,
        keys: &[JsonValue],
    ) -> Result<HashMap<String, Vec<JsonValue>>, DbErr>;
}

#[derive(Clone)]
pub struct NestedDef {
    /// Scalar attribute on the parent row holding the association key.
    pub foreign_key: String,
    pub kind: NestedKind,
    pub loader: Arc<dyn NestedLoader>,
}

/// Produces the public URL for an attachment field, or `None` when the row
/// has nothing attached.
pub trait AttachmentResolver: Send + Sync {
    fn url_for(&self, row: &JsonValue) -> Option<String>;
}

type RoleScopeFn = Arc<dyn Fn() -> Condition + Send + Sync>;

/// Everything the pipeline needs to know about one entity.
#[derive(Clone)]
pub struct ScopeDescriptor<E: EntityTrait> {
    fields: FieldMap<E>,
    filterable: BTreeSet<String>,
    sortable: BTreeSet<String>,
    model_fields_select: Vec<String>,
    unallowed_fields_select: BTreeSet<String>,
    nested: HashMap<String, NestedDef>,
    nested_names: BTreeSet<String>,
    attachments: HashMap<String, Arc<dyn AttachmentResolver>>,
    attachment_names: BTreeSet<String>,
    rules: AllowedRolesActions,
    role_scopes: HashMap<Role, RoleScopeFn>,
}

impl<E: EntityTrait> ScopeDescriptor<E> {
    pub fn new(fields: FieldMap<E>) -> Self {
        Self {
            fields,
            filterable: BTreeSet::new(),
            sortable: BTreeSet::new(),
            model_fields_select: Vec::new(),
            unallowed_fields_select: BTreeSet::new(),
            nested: HashMap::new(),
            nested_names: BTreeSet::new(),
            attachments: HashMap::new(),
            attachment_names: BTreeSet::new(),
            rules: AllowedRolesActions::new(),
            role_scopes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn filterable(mut self, names: &[&str]) -> Self {
        self.filterable
            .extend(names.iter().map(|n| n.to_lowercase()));
        self
    }

    #[must_use]
    pub fn sortable(mut self, names: &[&str]) -> Self {
        self.sortable.extend(names.iter().map(|n| n.to_lowercase()));
        self
    }

    /// Fields always included when the client sends an explicit
    /// `fields_select`; the requested names union onto these.
    #[must_use]
    pub fn model_fields_select(mut self, names: &[&str]) -> Self {
        self.model_fields_select
            .extend(names.iter().map(|n| n.to_lowercase()));
        self
    }

    /// Fields a client may never select, even explicitly.
    #[must_use]
    pub fn unallowed_fields_select(mut self, names: &[&str]) -> Self {
        self.unallowed_fields_select
            .extend(names.iter().map(|n| n.to_lowercase()));
        self
    }

    #[must_use]
    pub fn nested(mut self, name: impl Into<String>, def: NestedDef) -> Self {
        let name = name.into().to_lowercase();
        self.nested_names.insert(name.clone());
        self.nested.insert(name, def);
        self
    }

    #[must_use]
    pub fn attachment(
        mut self,
        name: impl Into<String>,
        resolver: Arc<dyn AttachmentResolver>,
    ) -> Self {
        let name = name.into().to_lowercase();
        self.attachment_names.insert(name.clone());
        self.attachments.insert(name, resolver);
        self
    }

    #[must_use]
    pub fn rules(mut self, rules: AllowedRolesActions) -> Self {
        self.rules = rules;
        self
    }

    /// Register the row-visibility scope for one role. Registration is
    /// explicit; a role without an entry contributes no rows.
    #[must_use]
    pub fn role_scope(
        mut self,
        role: impl AsRef<str>,
        scope: impl Fn() -> Condition + Send + Sync + 'static,
    ) -> Self {
        self.role_scopes.insert(Role::new(role), Arc::new(scope));
        self
    }

    #[must_use]
    pub fn fields(&self) -> &FieldMap<E> {
        &self.fields
    }

    #[must_use]
    pub fn filterable_fields(&self) -> &BTreeSet<String> {
        &self.filterable
    }

    #[must_use]
    pub fn sortable_fields(&self) -> &BTreeSet<String> {
        &self.sortable
    }

    #[must_use]
    pub fn allowed_roles_actions(&self) -> &AllowedRolesActions {
        &self.rules
    }

    #[must_use]
    pub fn nested_def(&self, name: &str) -> Option<&NestedDef> {
        self.nested.get(name)
    }

    #[must_use]
    pub fn attachment_resolver(&self, name: &str) -> Option<&Arc<dyn AttachmentResolver>> {
        self.attachments.get(name)
    }

    /// Borrowed view consumed by the projection stage.
    #[must_use]
    pub fn catalog(&self) -> FieldCatalog<'_> {
        FieldCatalog {
            attributes: self.fields.names(),
            model_fields_select: &self.model_fields_select,
            unallowed: &self.unallowed_fields_select,
            nested: &self.nested_names,
            attachments: &self.attachment_names,
        }
    }

    /// Union of the scopes registered for the given roles.
    ///
    /// Applied only when a principal is present. A principal whose roles
    /// match no registered scope sees nothing, which `1=0` expresses
    /// without a short-circuit in the pipeline.
    #[must_use]
    pub fn base_scope(&self, roles: &RoleSet) -> Condition {
        let mut matched = Condition::any();
        let mut hits = 0usize;
        for role in roles {
            if let Some(scope) = self.role_scopes.get(role) {
                matched = matched.add(scope());
                hits += 1;
            }
        }
        if hits == 0 {
            Condition::all().add(Expr::cust("1=0"))
        } else {
            matched
        }
    }
}
