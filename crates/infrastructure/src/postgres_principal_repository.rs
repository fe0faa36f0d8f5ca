use async_trait::async_trait;
use chrono::NaiveDate;
use orgaccess_application::{ModuleAccessEntry, PrincipalRepository};
use orgaccess_core::AppResult;
use orgaccess_domain::{
    AssignmentId, DepartmentId, PositionAssignment, PositionId, PositionPlacement, Principal,
    PrincipalId, SchoolId,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::storage_errors::{database_error, decode_key, decode_scope};

#[cfg(test)]
mod tests;

/// PostgreSQL-backed repository for principals and their position placement.
#[derive(Clone)]
pub struct PostgresPrincipalRepository {
    pool: PgPool,
}

impl PostgresPrincipalRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    id: Uuid,
    external_id: String,
    is_superadmin: bool,
    is_active: bool,
}

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Self {
            principal_id: PrincipalId::from_uuid(row.id),
            external_id: row.external_id,
            is_superadmin: row.is_superadmin,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    assignment_id: Uuid,
    principal_id: Uuid,
    is_active: bool,
    is_plt: bool,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    position_id: Uuid,
    hierarchy_level: i32,
    department_id: Option<Uuid>,
    school_id: Option<Uuid>,
    department_school_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct ModuleAccessRow {
    position_id: Uuid,
    resource: String,
    action: String,
    scope: Option<String>,
}

#[async_trait]
impl PrincipalRepository for PostgresPrincipalRepository {
    async fn find_principal_by_external_id(
        &self,
        external_id: &str,
    ) -> AppResult<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, external_id, is_superadmin, is_active
            FROM principals
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| database_error("failed to find principal by external id", error))?;

        Ok(row.map(Principal::from))
    }

    async fn find_principal(&self, principal_id: PrincipalId) -> AppResult<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, external_id, is_superadmin, is_active
            FROM principals
            WHERE id = $1
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| database_error("failed to find principal", error))?;

        Ok(row.map(Principal::from))
    }

    async fn list_active_position_assignments(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<PositionAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                assignments.id AS assignment_id,
                assignments.principal_id,
                assignments.is_active,
                assignments.is_plt,
                assignments.start_date,
                assignments.end_date,
                positions.id AS position_id,
                positions.hierarchy_level,
                positions.department_id,
                positions.school_id,
                departments.school_id AS department_school_id
            FROM position_assignments AS assignments
            INNER JOIN positions
                ON positions.id = assignments.position_id
            LEFT JOIN departments
                ON departments.id = positions.department_id
            WHERE assignments.principal_id = $1
                AND assignments.is_active
            ORDER BY positions.hierarchy_level, assignments.start_date
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list position assignments", error))?;

        Ok(rows
            .into_iter()
            .map(|row| PositionAssignment {
                assignment_id: AssignmentId::from_uuid(row.assignment_id),
                principal_id: PrincipalId::from_uuid(row.principal_id),
                position: PositionPlacement {
                    position_id: PositionId::from_uuid(row.position_id),
                    hierarchy_level: row.hierarchy_level,
                    department_id: row.department_id.map(DepartmentId::from_uuid),
                    school_id: row.school_id.map(SchoolId::from_uuid),
                    department_school_id: row.department_school_id.map(SchoolId::from_uuid),
                },
                is_active: row.is_active,
                is_plt: row.is_plt,
                start_date: row.start_date,
                end_date: row.end_date,
            })
            .collect())
    }

    async fn list_module_access_for_positions(
        &self,
        position_ids: &[PositionId],
    ) -> AppResult<Vec<ModuleAccessEntry>> {
        let position_ids: Vec<Uuid> = position_ids.iter().map(PositionId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ModuleAccessRow>(
            r#"
            SELECT position_id, resource, action, scope
            FROM position_module_access
            WHERE position_id = ANY($1)
            ORDER BY resource, action
            "#,
        )
        .bind(position_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| database_error("failed to list position module access", error))?;

        rows.into_iter()
            .map(|row| {
                Ok(ModuleAccessEntry {
                    position_id: PositionId::from_uuid(row.position_id),
                    key: decode_key(&row.resource, &row.action)?,
                    scope: decode_scope(row.scope.as_deref())?,
                })
            })
            .collect()
    }
}
