use super::*;

impl PostgresPermissionRepository {
    pub(super) async fn list_user_roles_impl(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT
                user_roles.principal_id,
                user_roles.role_id,
                user_roles.is_active,
                user_roles.valid_from,
                user_roles.valid_until
            FROM user_roles
            INNER JOIN roles
                ON roles.id = user_roles.role_id
            WHERE user_roles.principal_id = $1
            ORDER BY roles.hierarchy_level, roles.code
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list user roles", error))?;

        Ok(rows
            .into_iter()
            .map(|row| UserRoleAssignment {
                principal_id: PrincipalId::from_uuid(row.principal_id),
                role_id: RoleId::from_uuid(row.role_id),
                is_active: row.is_active,
                validity: ValidityWindow {
                    valid_from: row.valid_from,
                    valid_until: row.valid_until,
                },
            })
            .collect())
    }

    pub(super) async fn list_role_permission_rules_impl(
        &self,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<RolePermissionRule>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                role_permissions.role_id,
                role_permissions.permission_id,
                permissions.resource,
                permissions.action,
                permissions.scope,
                role_permissions.is_granted
            FROM role_permissions
            INNER JOIN permissions
                ON permissions.id = role_permissions.permission_id
            WHERE role_permissions.role_id = $1
                AND permissions.resource = $2
                AND permissions.action = $3
                AND ($4::TEXT IS NULL OR permissions.scope = $4)
                AND permissions.is_active
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(key.resource())
        .bind(key.action().as_str())
        .bind(scope.map(|scope| scope.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list role permission rules", error))?;

        rows.into_iter().map(RolePermissionRule::try_from).collect()
    }

    pub(super) async fn list_granted_role_permissions_impl(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RolePermissionRule>> {
        let role_ids: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                role_permissions.role_id,
                role_permissions.permission_id,
                permissions.resource,
                permissions.action,
                permissions.scope,
                role_permissions.is_granted
            FROM role_permissions
            INNER JOIN permissions
                ON permissions.id = role_permissions.permission_id
            WHERE role_permissions.role_id = ANY($1)
                AND role_permissions.is_granted
                AND permissions.is_active
            ORDER BY permissions.resource, permissions.action
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list granted role permissions", error))?;

        rows.into_iter().map(RolePermissionRule::try_from).collect()
    }

    pub(super) async fn list_parent_roles_impl(
        &self,
        role_id: RoleId,
    ) -> AppResult<Vec<RoleHierarchyEdge>> {
        let rows = sqlx::query_as::<_, RoleEdgeRow>(
            r#"
            SELECT child_role_id, parent_role_id, inherit_permissions
            FROM role_hierarchy
            WHERE child_role_id = $1
            ORDER BY parent_role_id
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list parent roles", error))?;

        Ok(rows
            .into_iter()
            .map(|row| RoleHierarchyEdge {
                child_role_id: RoleId::from_uuid(row.child_role_id),
                parent_role_id: RoleId::from_uuid(row.parent_role_id),
                inherit_permissions: row.inherit_permissions,
            })
            .collect())
    }
}
