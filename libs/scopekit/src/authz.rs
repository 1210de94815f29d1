//! Role-intersection authorization gate.
//!
//! Evaluated once per request, before the scope pipeline runs; a failure
//! short-circuits the entire request.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::context::Action;
use crate::errors::ScopeError;
use crate::roles::{Role, RoleSet};

/// Fixed user-visible message for a failed authorization check.
pub const FORBIDDEN_MESSAGE: &str = "Action not allowed";

/// Per-entity action → allowed-roles map, registered at boot.
#[derive(Debug, Clone, Default)]
pub struct AllowedRolesActions {
    map: HashMap<Action, BTreeSet<Role>>,
}

impl AllowedRolesActions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn allow(mut self, action: Action, roles: &[&str]) -> Self {
        self.map
            .entry(action)
            .or_default()
            .extend(roles.iter().map(Role::new));
        self
    }

    #[must_use]
    pub fn allowed(&self, action: Action) -> Option<&BTreeSet<Role>> {
        self.map.get(&action)
    }
}

/// Authorize `action` for a principal with the given resolved roles.
///
/// An absent principal is always authorized (row visibility is handled by the
/// base scope, not here). A present principal must have at least one role in
/// the allowed set for the action; missing rules mean an empty allowed set.
///
/// # Errors
/// Returns a `Forbidden`-status [`ScopeError`] with the fixed message and an
/// empty diagnostic body when the intersection is empty.
pub fn authorize(
    principal_present: bool,
    roles: &RoleSet,
    action: Action,
    rules: &AllowedRolesActions,
) -> Result<(), ScopeError> {
    if !principal_present {
        return Ok(());
    }
    let granted = rules
        .allowed(action)
        .is_some_and(|allowed| roles.iter().any(|role| allowed.contains(role)));
    if granted {
        Ok(())
    } else {
        tracing::debug!(action = action.as_str(), "authorization denied");
        Err(ScopeError::new(FORBIDDEN_MESSAGE, Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> RoleSet {
        names.iter().map(Role::new).collect()
    }

    #[test]
    fn anonymous_is_authorized() {
        let rules = AllowedRolesActions::new();
        assert!(authorize(false, &RoleSet::new(), Action::Index, &rules).is_ok());
    }

    #[test]
    fn intersecting_role_is_authorized() {
        let rules = AllowedRolesActions::new().allow(Action::Index, &["admin", "manager"]);
        assert!(authorize(true, &roles(&["manager"]), Action::Index, &rules).is_ok());
    }

    #[test]
    fn disjoint_roles_are_forbidden() {
        let rules = AllowedRolesActions::new().allow(Action::Index, &["admin"]);
        let err = authorize(true, &roles(&["viewer"]), Action::Index, &rules).unwrap_err();
        assert_eq!(err.message, FORBIDDEN_MESSAGE);
        assert!(err.body.is_null());
    }

    #[test]
    fn missing_rules_forbid_present_principal() {
        let rules = AllowedRolesActions::new();
        assert!(authorize(true, &roles(&["admin"]), Action::Show, &rules).is_err());
    }

    #[test]
    fn rules_are_per_action() {
        let rules = AllowedRolesActions::new().allow(Action::Index, &["admin"]);
        assert!(authorize(true, &roles(&["admin"]), Action::Index, &rules).is_ok());
        assert!(authorize(true, &roles(&["admin"]), Action::Show, &rules).is_err());
    }

    #[test]
    fn role_matching_is_case_normalized() {
        let rules = AllowedRolesActions::new().allow(Action::Index, &["Admin"]);
        assert!(authorize(true, &roles(&["ADMIN"]), Action::Index, &rules).is_ok());
    }
}
