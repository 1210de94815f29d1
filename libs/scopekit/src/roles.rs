//! Role resolution: normalizes a principal's role attribute into a canonical
//! set of lowercase roles.

use std::collections::BTreeSet;
use std::fmt;

/// A normalized (lowercase) symbolic role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical set of a principal's roles; empty when the principal is absent
/// or carries no role attribute.
pub type RoleSet = BTreeSet<Role>;

/// Raw role attribute as exposed by a principal: a single scalar, a sequence,
/// or nothing at all.
#[derive(Debug, Clone)]
pub enum RoleAttr {
    Absent,
    One(String),
    Many(Vec<String>),
}

/// The authenticated actor making the request.
///
/// Implementations expose their role attribute explicitly instead of the
/// engine reading a configurable attribute name reflectively.
pub trait Principal {
    fn role_attr(&self) -> RoleAttr;
}

/// Resolve a principal into a canonical `RoleSet`. Never fails: an absent
/// principal or attribute yields the empty set; scalars wrap into a
/// one-element set; sequences flatten; duplicates collapse.
#[must_use]
pub fn resolve(principal: Option<&dyn Principal>) -> RoleSet {
    let Some(principal) = principal else {
        return RoleSet::new();
    };
    match principal.role_attr() {
        RoleAttr::Absent => RoleSet::new(),
        RoleAttr::One(role) => [Role::new(role)].into_iter().collect(),
        RoleAttr::Many(list) => list.iter().map(Role::new).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(RoleAttr);

    impl Principal for Fixed {
        fn role_attr(&self) -> RoleAttr {
            self.0.clone()
        }
    }

    #[test]
    fn absent_principal_yields_empty_set() {
        assert!(resolve(None).is_empty());
    }

    #[test]
    fn absent_attribute_yields_empty_set() {
        let p = Fixed(RoleAttr::Absent);
        assert!(resolve(Some(&p)).is_empty());
    }

    #[test]
    fn scalar_wraps_and_lowercases() {
        let p = Fixed(RoleAttr::One("Admin".into()));
        let roles = resolve(Some(&p));
        assert_eq!(roles.len(), 1);
        assert!(roles.contains(&Role::new("admin")));
    }

    #[test]
    fn sequence_flattens_and_deduplicates() {
        let p = Fixed(RoleAttr::Many(vec![
            "ADMIN".into(),
            "manager".into(),
            "admin".into(),
        ]));
        let roles = resolve(Some(&p));
        assert_eq!(roles.len(), 2);
        assert!(roles.contains(&Role::new("admin")));
        assert!(roles.contains(&Role::new("manager")));
    }
}
