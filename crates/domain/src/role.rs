use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccessScope, PermissionId, PermissionKey, PrincipalId, RoleId};

/// Inclusive validity window for grants and role memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First instant the record applies.
    pub valid_from: DateTime<Utc>,
    /// Last instant the record applies; unbounded when absent.
    pub valid_until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// Creates a window starting at `valid_from` without an end.
    #[must_use]
    pub fn starting(valid_from: DateTime<Utc>) -> Self {
        Self {
            valid_from,
            valid_until: None,
        }
    }

    /// Returns whether the window covers `now`.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && self.valid_until.is_none_or(|until| now <= until)
    }
}

/// Named role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier.
    pub role_id: RoleId,
    /// Unique role code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Seniority level; lower values are more senior.
    pub hierarchy_level: i32,
    /// Roles managed by the system cannot be edited by administrators.
    pub is_system_role: bool,
}

/// Role-level grant or explicit deny for one permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionRule {
    /// Role carrying the rule.
    pub role_id: RoleId,
    /// Permission the rule applies to.
    pub permission_id: PermissionId,
    /// Resource and action of the permission.
    pub key: PermissionKey,
    /// Scope of the permission, when scoped.
    pub scope: Option<AccessScope>,
    /// `false` marks an explicit deny.
    pub is_granted: bool,
}

/// Parent/child edge in the role hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHierarchyEdge {
    /// Inheriting role.
    pub child_role_id: RoleId,
    /// Role whose grants may be inherited.
    pub parent_role_id: RoleId,
    /// Whether the child pulls in the parent's grants.
    pub inherit_permissions: bool,
}

/// Role membership of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    /// Role holder.
    pub principal_id: PrincipalId,
    /// Held role.
    pub role_id: RoleId,
    /// Administrative activity flag.
    pub is_active: bool,
    /// Period the membership applies.
    pub validity: ValidityWindow,
}

impl UserRoleAssignment {
    /// Returns whether the membership is active and valid at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.validity.contains(now)
    }
}

/// Direct principal-level grant or deny overriding role grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionGrant {
    /// Principal receiving the grant.
    pub principal_id: PrincipalId,
    /// Permission the grant applies to.
    pub permission_id: PermissionId,
    /// Resource and action of the permission.
    pub key: PermissionKey,
    /// Scope of the permission, when scoped.
    pub scope: Option<AccessScope>,
    /// `false` marks an explicit deny.
    pub is_granted: bool,
    /// Higher priorities win among competing direct grants.
    pub priority: i32,
    /// Period the grant applies.
    pub validity: ValidityWindow,
    /// Temporary grants are expected to carry an end date.
    pub is_temporary: bool,
    /// Principal who issued the grant.
    pub granted_by: Option<PrincipalId>,
    /// Free-form justification.
    pub grant_reason: Option<String>,
}

impl UserPermissionGrant {
    /// Returns whether the grant applies at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.validity.contains(now)
    }
}
