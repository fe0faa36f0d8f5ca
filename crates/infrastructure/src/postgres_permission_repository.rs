use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgaccess_application::PermissionRepository;
use orgaccess_core::AppResult;
use orgaccess_domain::{
    AccessScope, PermissionId, PermissionKey, PrincipalId, RoleHierarchyEdge, RoleId,
    RolePermissionRule, UserPermissionGrant, UserRoleAssignment, ValidityWindow,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::storage_errors::{database_error, decode_key, decode_scope};

mod direct_rules;
mod role_rules;

#[cfg(test)]
mod tests;

/// PostgreSQL-backed repository for direct grants, role rules and the role hierarchy.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserPermissionRow {
    principal_id: Uuid,
    permission_id: Uuid,
    resource: String,
    action: String,
    scope: Option<String>,
    is_granted: bool,
    priority: i32,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    is_temporary: bool,
    granted_by: Option<Uuid>,
    grant_reason: Option<String>,
}

impl TryFrom<UserPermissionRow> for UserPermissionGrant {
    type Error = orgaccess_core::AppError;

    fn try_from(row: UserPermissionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            principal_id: PrincipalId::from_uuid(row.principal_id),
            permission_id: PermissionId::from_uuid(row.permission_id),
            key: decode_key(&row.resource, &row.action)?,
            scope: decode_scope(row.scope.as_deref())?,
            is_granted: row.is_granted,
            priority: row.priority,
            validity: ValidityWindow {
                valid_from: row.valid_from,
                valid_until: row.valid_until,
            },
            is_temporary: row.is_temporary,
            granted_by: row.granted_by.map(PrincipalId::from_uuid),
            grant_reason: row.grant_reason,
        })
    }
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: Uuid,
    permission_id: Uuid,
    resource: String,
    action: String,
    scope: Option<String>,
    is_granted: bool,
}

impl TryFrom<RolePermissionRow> for RolePermissionRule {
    type Error = orgaccess_core::AppError;

    fn try_from(row: RolePermissionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role_id: RoleId::from_uuid(row.role_id),
            permission_id: PermissionId::from_uuid(row.permission_id),
            key: decode_key(&row.resource, &row.action)?,
            scope: decode_scope(row.scope.as_deref())?,
            is_granted: row.is_granted,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    principal_id: Uuid,
    role_id: Uuid,
    is_active: bool,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct RoleEdgeRow {
    child_role_id: Uuid,
    parent_role_id: Uuid,
    inherit_permissions: bool,
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn list_direct_permissions(
        &self,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<UserPermissionGrant>> {
        self.list_direct_permissions_impl(principal_id, key, scope)
            .await
    }

    async fn list_user_roles(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        self.list_user_roles_impl(principal_id).await
    }

    async fn list_role_permission_rules(
        &self,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<RolePermissionRule>> {
        self.list_role_permission_rules_impl(role_id, key, scope)
            .await
    }

    async fn list_granted_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RolePermissionRule>> {
        self.list_granted_role_permissions_impl(role_ids).await
    }

    async fn list_parent_roles(&self, role_id: RoleId) -> AppResult<Vec<RoleHierarchyEdge>> {
        self.list_parent_roles_impl(role_id).await
    }
}
