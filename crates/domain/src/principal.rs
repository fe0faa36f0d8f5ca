use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{AccessScope, DepartmentId, PermissionKey, PositionId, PrincipalId, SchoolId};

/// Internal profile of an authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Internal profile identifier.
    pub principal_id: PrincipalId,
    /// Subject claim issued by the identity provider.
    pub external_id: String,
    /// Superadmins pass every check that no explicit rule decided.
    pub is_superadmin: bool,
    /// Deactivated principals resolve to a least-privilege context.
    pub is_active: bool,
}

/// Immutable authorization context derived for one principal.
///
/// Contexts are rebuilt wholesale whenever the underlying assignments change;
/// there are no mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalContext {
    principal_id: Option<PrincipalId>,
    is_superadmin: bool,
    effective_scope: AccessScope,
    position_ids: BTreeSet<PositionId>,
    department_ids: BTreeSet<DepartmentId>,
    school_ids: BTreeSet<SchoolId>,
    permission_scopes: BTreeMap<PermissionKey, AccessScope>,
}

/// Organizational memberships collected from a principal's active assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationMemberships {
    /// Occupied positions.
    pub position_ids: BTreeSet<PositionId>,
    /// Departments of the occupied positions.
    pub department_ids: BTreeSet<DepartmentId>,
    /// Schools of the occupied positions and of their departments.
    pub school_ids: BTreeSet<SchoolId>,
}

impl PrincipalContext {
    /// Creates a context for a provisioned principal.
    #[must_use]
    pub fn new(
        principal_id: PrincipalId,
        is_superadmin: bool,
        effective_scope: AccessScope,
        memberships: OrganizationMemberships,
        permission_scopes: BTreeMap<PermissionKey, AccessScope>,
    ) -> Self {
        Self {
            principal_id: Some(principal_id),
            is_superadmin,
            effective_scope,
            position_ids: memberships.position_ids,
            department_ids: memberships.department_ids,
            school_ids: memberships.school_ids,
            permission_scopes,
        }
    }

    /// Creates the least-privilege context of an authenticated but unprovisioned identity.
    #[must_use]
    pub fn unprovisioned() -> Self {
        Self {
            principal_id: None,
            is_superadmin: false,
            effective_scope: AccessScope::Own,
            position_ids: BTreeSet::new(),
            department_ids: BTreeSet::new(),
            school_ids: BTreeSet::new(),
            permission_scopes: BTreeMap::new(),
        }
    }

    /// Returns the internal principal id; `None` when unprovisioned.
    #[must_use]
    pub fn principal_id(&self) -> Option<PrincipalId> {
        self.principal_id
    }

    /// Returns whether an internal profile backs this context.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.principal_id.is_some()
    }

    /// Returns the superadmin flag.
    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        self.is_superadmin
    }

    /// Returns the scope calculated from the principal's positions.
    #[must_use]
    pub fn effective_scope(&self) -> AccessScope {
        self.effective_scope
    }

    /// Returns occupied position ids.
    #[must_use]
    pub fn position_ids(&self) -> &BTreeSet<PositionId> {
        &self.position_ids
    }

    /// Returns department ids of occupied positions.
    #[must_use]
    pub fn department_ids(&self) -> &BTreeSet<DepartmentId> {
        &self.department_ids
    }

    /// Returns school ids of occupied positions.
    #[must_use]
    pub fn school_ids(&self) -> &BTreeSet<SchoolId> {
        &self.school_ids
    }

    /// Returns every resolved `(resource, action)` scope.
    #[must_use]
    pub fn permission_scopes(&self) -> &BTreeMap<PermissionKey, AccessScope> {
        &self.permission_scopes
    }

    /// Returns the scope resolved for a key, defaulting to [`AccessScope::Own`].
    #[must_use]
    pub fn scope_for(&self, key: &PermissionKey) -> AccessScope {
        self.permission_scopes
            .get(key)
            .copied()
            .unwrap_or(AccessScope::Own)
    }
}

/// Merges a scope into a key map, never narrowing an existing entry.
pub fn merge_permission_scope(
    scopes: &mut BTreeMap<PermissionKey, AccessScope>,
    key: PermissionKey,
    scope: AccessScope,
) {
    scopes
        .entry(key)
        .and_modify(|current| *current = current.most_permissive(scope))
        .or_insert(scope);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{PrincipalContext, merge_permission_scope};
    use crate::{AccessScope, PermissionAction, PermissionKey};

    fn key(resource: &str) -> PermissionKey {
        match PermissionKey::new(resource, PermissionAction::Read) {
            Ok(key) => key,
            Err(error) => panic!("invalid test key: {error}"),
        }
    }

    #[test]
    fn merge_keeps_more_permissive_scope() {
        let mut scopes = BTreeMap::new();
        merge_permission_scope(&mut scopes, key("organization"), AccessScope::School);
        merge_permission_scope(&mut scopes, key("organization"), AccessScope::Own);
        merge_permission_scope(&mut scopes, key("organization"), AccessScope::Department);

        assert_eq!(scopes.get(&key("organization")), Some(&AccessScope::School));
    }

    #[test]
    fn unprovisioned_context_is_least_privilege() {
        let context = PrincipalContext::unprovisioned();
        assert!(!context.is_provisioned());
        assert!(!context.is_superadmin());
        assert!(context.school_ids().is_empty());
        assert_eq!(context.scope_for(&key("reports")), AccessScope::Own);
    }
}
