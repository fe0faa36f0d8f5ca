use async_trait::async_trait;
use orgaccess_core::AppResult;
use orgaccess_domain::{
    AccessScope, PermissionKey, PrincipalId, RoleHierarchyEdge, RoleId, ValidityWindow,
};

/// Input payload for direct principal grants and denies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantUserPermissionInput {
    /// Principal receiving the grant.
    pub principal_id: PrincipalId,
    /// Resource and action.
    pub key: PermissionKey,
    /// Scope of the targeted permission.
    pub scope: Option<AccessScope>,
    /// `false` records an explicit deny.
    pub is_granted: bool,
    /// Higher priorities win among competing direct grants.
    pub priority: i32,
    /// Period the grant applies.
    pub validity: ValidityWindow,
    /// Temporary grants must carry an end.
    pub is_temporary: bool,
    /// Issuing principal, filled in from the acting context.
    pub granted_by: Option<PrincipalId>,
    /// Free-form justification.
    pub grant_reason: Option<String>,
}

/// Input payload for role grants and denies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissionInput {
    /// Role receiving the rule.
    pub role_id: RoleId,
    /// Resource and action.
    pub key: PermissionKey,
    /// Scope of the targeted permission.
    pub scope: Option<AccessScope>,
    /// `false` records an explicit deny.
    pub is_granted: bool,
}

/// Repository port for permission administration writes.
#[async_trait]
pub trait PermissionAdminRepository: Send + Sync {
    /// Inserts or replaces a direct grant.
    async fn upsert_user_permission(&self, input: GrantUserPermissionInput) -> AppResult<()>;

    /// Removes a direct grant; returns whether one existed.
    async fn remove_user_permission(
        &self,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<bool>;

    /// Inserts or replaces a role rule.
    async fn upsert_role_permission(&self, input: RolePermissionInput) -> AppResult<()>;

    /// Removes a role rule; returns whether one existed.
    async fn remove_role_permission(
        &self,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<bool>;

    /// Lists principals currently holding a role directly.
    async fn list_role_holders(&self, role_id: RoleId) -> AppResult<Vec<PrincipalId>>;

    /// Inserts a hierarchy edge.
    ///
    /// Implementations re-check for cycles atomically with the write and
    /// return `Conflict` when the edge would close one.
    async fn insert_role_hierarchy_edge(&self, edge: RoleHierarchyEdge) -> AppResult<()>;

    /// Removes a hierarchy edge; returns whether one existed.
    async fn remove_role_hierarchy_edge(
        &self,
        child_role_id: RoleId,
        parent_role_id: RoleId,
    ) -> AppResult<bool>;
}
