use async_trait::async_trait;
use orgaccess_application::EntityAccessRepository;
use orgaccess_core::AppResult;
use orgaccess_domain::{AccessEntityType, DepartmentId, EntityOwnership, PrincipalId, SchoolId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::storage_errors::database_error;

/// PostgreSQL-backed single-row ownership lookups for record-level checks.
#[derive(Clone)]
pub struct PostgresEntityAccessRepository {
    pool: PgPool,
}

impl PostgresEntityAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OwnershipRow {
    owner_id: Option<Uuid>,
    department_id: Option<Uuid>,
    school_id: Option<Uuid>,
    department_school_id: Option<Uuid>,
}

fn ownership_query(entity_type: AccessEntityType) -> &'static str {
    match entity_type {
        AccessEntityType::Position => {
            r#"
            SELECT
                positions.created_by AS owner_id,
                positions.department_id,
                positions.school_id,
                departments.school_id AS department_school_id
            FROM positions
            LEFT JOIN departments
                ON departments.id = positions.department_id
            WHERE positions.id = $1
            "#
        }
        AccessEntityType::Department => {
            r#"
            SELECT
                departments.created_by AS owner_id,
                departments.id AS department_id,
                departments.school_id,
                departments.school_id AS department_school_id
            FROM departments
            WHERE departments.id = $1
            "#
        }
        AccessEntityType::School => {
            r#"
            SELECT
                schools.created_by AS owner_id,
                NULL::UUID AS department_id,
                schools.id AS school_id,
                NULL::UUID AS department_school_id
            FROM schools
            WHERE schools.id = $1
            "#
        }
        AccessEntityType::PositionAssignment => {
            r#"
            SELECT
                assignments.principal_id AS owner_id,
                positions.department_id,
                positions.school_id,
                departments.school_id AS department_school_id
            FROM position_assignments AS assignments
            INNER JOIN positions
                ON positions.id = assignments.position_id
            LEFT JOIN departments
                ON departments.id = positions.department_id
            WHERE assignments.id = $1
            "#
        }
    }
}

#[async_trait]
impl EntityAccessRepository for PostgresEntityAccessRepository {
    async fn load_entity_ownership(
        &self,
        entity_type: AccessEntityType,
        entity_id: Uuid,
    ) -> AppResult<Option<EntityOwnership>> {
        let row = sqlx::query_as::<_, OwnershipRow>(ownership_query(entity_type))
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                database_error(
                    &format!("failed to load {} ownership", entity_type.as_str()),
                    error,
                )
            })?;

        Ok(row.map(|row| EntityOwnership {
            owner_id: row.owner_id.map(PrincipalId::from_uuid),
            department_id: row.department_id.map(DepartmentId::from_uuid),
            school_id: row.school_id.map(SchoolId::from_uuid),
            department_school_id: row.department_school_id.map(SchoolId::from_uuid),
        }))
    }
}
