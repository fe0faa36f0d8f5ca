use orgaccess_application::PrincipalRepository;
use orgaccess_domain::{PermissionAction, PositionId, PrincipalId};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresPrincipalRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres principal repository tests: {error}");
    }

    Some(pool)
}

async fn execute(pool: &PgPool, statement: &str, ids: &[Uuid]) {
    let mut query = sqlx::query(statement);
    for id in ids {
        query = query.bind(*id);
    }

    let result = query.execute(pool).await;
    assert!(result.is_ok(), "statement failed: {result:?}");
}

#[tokio::test]
async fn assignments_carry_department_school_and_module_access() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let principal_id = Uuid::new_v4();
    let school_id = Uuid::new_v4();
    let department_id = Uuid::new_v4();
    let position_id = Uuid::new_v4();
    let inactive_position_id = Uuid::new_v4();
    let external_id = format!("idp|{principal_id}");

    let insert = sqlx::query(
        r#"
        INSERT INTO principals (id, external_id, display_name)
        VALUES ($1, $2, 'Principal Repo Test')
        "#,
    )
    .bind(principal_id)
    .bind(external_id.as_str())
    .execute(&pool)
    .await;
    assert!(insert.is_ok());

    execute(
        &pool,
        "INSERT INTO schools (id, name) VALUES ($1, 'North School')",
        &[school_id],
    )
    .await;
    execute(
        &pool,
        "INSERT INTO departments (id, name, school_id) VALUES ($1, 'Science', $2)",
        &[department_id, school_id],
    )
    .await;
    execute(
        &pool,
        "INSERT INTO positions (id, name, hierarchy_level, department_id) VALUES ($1, 'Head of Science', 3, $2)",
        &[position_id, department_id],
    )
    .await;
    execute(
        &pool,
        "INSERT INTO positions (id, name, hierarchy_level) VALUES ($1, 'Former Principal', 1)",
        &[inactive_position_id],
    )
    .await;
    execute(
        &pool,
        "INSERT INTO position_assignments (id, principal_id, position_id, start_date) VALUES ($1, $2, $3, CURRENT_DATE)",
        &[Uuid::new_v4(), principal_id, position_id],
    )
    .await;
    execute(
        &pool,
        "INSERT INTO position_assignments (id, principal_id, position_id, is_active, start_date) VALUES ($1, $2, $3, FALSE, CURRENT_DATE)",
        &[Uuid::new_v4(), principal_id, inactive_position_id],
    )
    .await;
    execute(
        &pool,
        "INSERT INTO position_module_access (position_id, resource, action, scope) VALUES ($1, 'organization', 'READ', NULL)",
        &[position_id],
    )
    .await;

    let repository = PostgresPrincipalRepository::new(pool);

    let Ok(Some(principal)) = repository
        .find_principal_by_external_id(external_id.as_str())
        .await
    else {
        panic!("principal should be found");
    };
    assert_eq!(principal.principal_id, PrincipalId::from_uuid(principal_id));
    assert!(principal.is_active);
    assert!(!principal.is_superadmin);

    let Ok(assignments) = repository
        .list_active_position_assignments(principal.principal_id)
        .await
    else {
        panic!("assignments should load");
    };
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].position.hierarchy_level, 3);
    assert_eq!(
        assignments[0]
            .position
            .department_school_id
            .map(|id| id.as_uuid()),
        Some(school_id)
    );

    let Ok(entries) = repository
        .list_module_access_for_positions(&[PositionId::from_uuid(position_id)])
        .await
    else {
        panic!("module access should load");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key.resource(), "organization");
    assert_eq!(entries[0].key.action(), PermissionAction::Read);
    assert_eq!(entries[0].scope, None);
}

#[tokio::test]
async fn unknown_subject_is_none() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresPrincipalRepository::new(pool);
    let principal = repository
        .find_principal_by_external_id("idp|does-not-exist")
        .await;
    assert!(matches!(principal, Ok(None)));
}
