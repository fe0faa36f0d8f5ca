use async_trait::async_trait;
use orgaccess_application::{
    GrantUserPermissionInput, PermissionAdminRepository, RolePermissionInput,
};
use orgaccess_core::{AppError, AppResult};
use orgaccess_domain::{AccessScope, PermissionKey, PrincipalId, RoleHierarchyEdge, RoleId};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::storage_errors::database_error;

/// PostgreSQL-backed writes for permission administration.
#[derive(Clone)]
pub struct PostgresPermissionAdminRepository {
    pool: PgPool,
}

impl PostgresPermissionAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Returns the id of the permission row for `(key, scope)`, creating it when missing.
///
/// Rules attached to a deactivated permission would never be read back, so
/// writes against one are rejected.
async fn ensure_permission(
    transaction: &mut Transaction<'_, Postgres>,
    key: &PermissionKey,
    scope: Option<AccessScope>,
) -> AppResult<Uuid> {
    let (permission_id, is_active) = sqlx::query_as::<_, (Uuid, bool)>(
        r#"
        INSERT INTO permissions (id, resource, action, scope)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (resource, action, (COALESCE(scope, '')))
        DO UPDATE SET resource = EXCLUDED.resource
        RETURNING id, is_active
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(key.resource())
    .bind(key.action().as_str())
    .bind(scope.map(|scope| scope.as_str()))
    .fetch_one(&mut **transaction)
    .await
    .map_err(|error| database_error("failed to ensure permission", error))?;

    if !is_active {
        return Err(AppError::Conflict(format!(
            "permission '{key}' is deactivated and cannot be assigned"
        )));
    }

    Ok(permission_id)
}

#[async_trait]
impl PermissionAdminRepository for PostgresPermissionAdminRepository {
    async fn upsert_user_permission(&self, input: GrantUserPermissionInput) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;
        let permission_id = ensure_permission(&mut transaction, &input.key, input.scope).await?;

        sqlx::query(
            r#"
            INSERT INTO user_permissions (
                principal_id, permission_id, is_granted, priority, valid_from, valid_until,
                is_temporary, granted_by, grant_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (principal_id, permission_id)
            DO UPDATE SET
                is_granted = EXCLUDED.is_granted,
                priority = EXCLUDED.priority,
                valid_from = EXCLUDED.valid_from,
                valid_until = EXCLUDED.valid_until,
                is_temporary = EXCLUDED.is_temporary,
                granted_by = EXCLUDED.granted_by,
                grant_reason = EXCLUDED.grant_reason
            "#,
        )
        .bind(input.principal_id.as_uuid())
        .bind(permission_id)
        .bind(input.is_granted)
        .bind(input.priority)
        .bind(input.validity.valid_from)
        .bind(input.validity.valid_until)
        .bind(input.is_temporary)
        .bind(input.granted_by.map(|principal_id| principal_id.as_uuid()))
        .bind(input.grant_reason)
        .execute(&mut *transaction)
        .await
        .map_err(|error| database_error("failed to write user permission", error))?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit user permission", error))
    }

    async fn remove_user_permission(
        &self,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_permissions AS grants
            USING permissions
            WHERE permissions.id = grants.permission_id
                AND grants.principal_id = $1
                AND permissions.resource = $2
                AND permissions.action = $3
                AND permissions.scope IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(key.resource())
        .bind(key.action().as_str())
        .bind(scope.map(|scope| scope.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|error| database_error("failed to remove user permission", error))?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_role_permission(&self, input: RolePermissionInput) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;
        let permission_id = ensure_permission(&mut transaction, &input.key, input.scope).await?;

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id, is_granted)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, permission_id)
            DO UPDATE SET is_granted = EXCLUDED.is_granted
            "#,
        )
        .bind(input.role_id.as_uuid())
        .bind(permission_id)
        .bind(input.is_granted)
        .execute(&mut *transaction)
        .await
        .map_err(|error| database_error("failed to write role permission", error))?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit role permission", error))
    }

    async fn remove_role_permission(
        &self,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM role_permissions
            USING permissions
            WHERE permissions.id = role_permissions.permission_id
                AND role_permissions.role_id = $1
                AND permissions.resource = $2
                AND permissions.action = $3
                AND permissions.scope IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(key.resource())
        .bind(key.action().as_str())
        .bind(scope.map(|scope| scope.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|error| database_error("failed to remove role permission", error))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_role_holders(&self, role_id: RoleId) -> AppResult<Vec<PrincipalId>> {
        let principal_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT principal_id
            FROM user_roles
            WHERE role_id = $1
                AND is_active
                AND valid_from <= NOW()
                AND (valid_until IS NULL OR valid_until >= NOW())
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list role holders", error))?;

        Ok(principal_ids
            .into_iter()
            .map(PrincipalId::from_uuid)
            .collect())
    }

    async fn insert_role_hierarchy_edge(&self, edge: RoleHierarchyEdge) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| database_error("failed to start transaction", error))?;

        // Serializes hierarchy writers so concurrent links cannot each miss
        // the other's edge.
        sqlx::query("LOCK TABLE role_hierarchy IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *transaction)
            .await
            .map_err(|error| database_error("failed to lock role hierarchy", error))?;

        let closes_cycle = sqlx::query_scalar::<_, bool>(
            r#"
            WITH RECURSIVE ancestors (role_id) AS (
                SELECT $1::UUID
                UNION
                SELECT role_hierarchy.parent_role_id
                FROM role_hierarchy
                INNER JOIN ancestors ON ancestors.role_id = role_hierarchy.child_role_id
            )
            SELECT EXISTS (SELECT 1 FROM ancestors WHERE role_id = $2)
            "#,
        )
        .bind(edge.parent_role_id.as_uuid())
        .bind(edge.child_role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| database_error("failed to check role hierarchy for cycles", error))?;

        if closes_cycle {
            return Err(AppError::Conflict(format!(
                "linking role '{}' under '{}' would create a cycle",
                edge.child_role_id, edge.parent_role_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO role_hierarchy (child_role_id, parent_role_id, inherit_permissions)
            VALUES ($1, $2, $3)
            ON CONFLICT (child_role_id, parent_role_id)
            DO UPDATE SET inherit_permissions = EXCLUDED.inherit_permissions
            "#,
        )
        .bind(edge.child_role_id.as_uuid())
        .bind(edge.parent_role_id.as_uuid())
        .bind(edge.inherit_permissions)
        .execute(&mut *transaction)
        .await
        .map_err(|error| database_error("failed to write role hierarchy edge", error))?;

        transaction
            .commit()
            .await
            .map_err(|error| database_error("failed to commit role hierarchy edge", error))
    }

    async fn remove_role_hierarchy_edge(
        &self,
        child_role_id: RoleId,
        parent_role_id: RoleId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM role_hierarchy
            WHERE child_role_id = $1
                AND parent_role_id = $2
            "#,
        )
        .bind(child_role_id.as_uuid())
        .bind(parent_role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| database_error("failed to remove role hierarchy edge", error))?;

        Ok(result.rows_affected() > 0)
    }
}
