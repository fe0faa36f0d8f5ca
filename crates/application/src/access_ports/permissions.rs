use async_trait::async_trait;
use orgaccess_core::AppResult;
use orgaccess_domain::{
    AccessScope, PermissionKey, PrincipalId, RoleHierarchyEdge, RoleId, RolePermissionRule,
    UserPermissionGrant, UserRoleAssignment,
};

/// Repository port for the permission tables consulted by the resolver.
///
/// `scope` arguments restrict matches to permissions carrying exactly that
/// scope; `None` matches any scope. Only active permissions are returned.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Lists direct grants and denies of a principal for a key.
    async fn list_direct_permissions(
        &self,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<UserPermissionGrant>>;

    /// Lists role memberships of a principal, ordered by role seniority.
    async fn list_user_roles(&self, principal_id: PrincipalId)
    -> AppResult<Vec<UserRoleAssignment>>;

    /// Lists grant and deny rules of one role for a key.
    async fn list_role_permission_rules(
        &self,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<RolePermissionRule>>;

    /// Lists every granted rule of the given roles.
    async fn list_granted_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RolePermissionRule>>;

    /// Lists hierarchy edges pointing from a role to its parents.
    async fn list_parent_roles(&self, role_id: RoleId) -> AppResult<Vec<RoleHierarchyEdge>>;
}
