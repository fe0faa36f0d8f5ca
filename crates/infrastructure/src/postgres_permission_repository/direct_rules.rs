use super::*;

impl PostgresPermissionRepository {
    pub(super) async fn list_direct_permissions_impl(
        &self,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<UserPermissionGrant>> {
        let rows = sqlx::query_as::<_, UserPermissionRow>(
            r#"
            SELECT
                grants.principal_id,
                grants.permission_id,
                permissions.resource,
                permissions.action,
                permissions.scope,
                grants.is_granted,
                grants.priority,
                grants.valid_from,
                grants.valid_until,
                grants.is_temporary,
                grants.granted_by,
                grants.grant_reason
            FROM user_permissions AS grants
            INNER JOIN permissions
                ON permissions.id = grants.permission_id
            WHERE grants.principal_id = $1
                AND permissions.resource = $2
                AND permissions.action = $3
                AND ($4::TEXT IS NULL OR permissions.scope = $4)
                AND permissions.is_active
            ORDER BY grants.priority DESC
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(key.resource())
        .bind(key.action().as_str())
        .bind(scope.map(|scope| scope.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list direct permissions", error))?;

        rows.into_iter().map(UserPermissionGrant::try_from).collect()
    }
}
