use std::sync::Arc;

use chrono::{Duration, Utc};
use orgaccess_application::{
    AuthorizationService, DecisionSource, GrantUserPermissionInput, PermissionAdminRepository,
    PermissionCache, PermissionRepository, RolePermissionInput,
};
use orgaccess_core::AppError;
use orgaccess_domain::{
    PermissionAction, PermissionKey, PermissionRequest, PrincipalId, RoleHierarchyEdge, RoleId,
    ValidityWindow,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresPermissionRepository;
use crate::{
    PostgresPermissionAdminRepository, PostgresPermissionCacheRepository,
    PostgresPrincipalRepository,
};

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
        panic!("failed to run migrations for postgres permission repository tests: {error}");
    }

    Some(pool)
}

async fn ensure_principal(pool: &PgPool, is_superadmin: bool) -> PrincipalId {
    let principal_id = Uuid::new_v4();
    let insert = sqlx::query(
        r#"
        INSERT INTO principals (id, external_id, is_superadmin)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(principal_id)
    .bind(format!("idp|{principal_id}"))
    .bind(is_superadmin)
    .execute(pool)
    .await;
    assert!(insert.is_ok());

    PrincipalId::from_uuid(principal_id)
}

async fn ensure_role(pool: &PgPool, code_prefix: &str) -> RoleId {
    let role_id = Uuid::new_v4();
    let insert = sqlx::query(
        r#"
        INSERT INTO roles (id, code, name)
        VALUES ($1, $2, $2)
        "#,
    )
    .bind(role_id)
    .bind(format!("{code_prefix}-{role_id}"))
    .execute(pool)
    .await;
    assert!(insert.is_ok());

    RoleId::from_uuid(role_id)
}

async fn assign_role(pool: &PgPool, principal_id: PrincipalId, role_id: RoleId) {
    let insert = sqlx::query(
        r#"
        INSERT INTO user_roles (principal_id, role_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(principal_id.as_uuid())
    .bind(role_id.as_uuid())
    .execute(pool)
    .await;
    assert!(insert.is_ok());
}

fn unique_key(action: PermissionAction) -> PermissionKey {
    match PermissionKey::new(format!("budget_{}", Uuid::new_v4().simple()), action) {
        Ok(key) => key,
        Err(error) => panic!("invalid test key: {error}"),
    }
}

fn authorization(pool: &PgPool) -> AuthorizationService {
    AuthorizationService::new(
        Arc::new(PostgresPrincipalRepository::new(pool.clone())),
        Arc::new(PostgresPermissionRepository::new(pool.clone())),
        PermissionCache::new(
            Arc::new(PostgresPermissionCacheRepository::new(pool.clone())),
            300,
        ),
    )
}

#[tokio::test]
async fn inherited_role_grant_resolves_and_is_cached() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let admin = PostgresPermissionAdminRepository::new(pool.clone());
    let principal_id = ensure_principal(&pool, false).await;
    let parent = ensure_role(&pool, "approver").await;
    let child = ensure_role(&pool, "deputy").await;
    let key = unique_key(PermissionAction::Approve);

    assert!(
        admin
            .upsert_role_permission(RolePermissionInput {
                role_id: parent,
                key: key.clone(),
                scope: None,
                is_granted: true,
            })
            .await
            .is_ok()
    );
    assert!(
        admin
            .insert_role_hierarchy_edge(RoleHierarchyEdge {
                child_role_id: child,
                parent_role_id: parent,
                inherit_permissions: true,
            })
            .await
            .is_ok()
    );
    assign_role(&pool, principal_id, child).await;

    let service = authorization(&pool);
    let request = PermissionRequest::new(key);

    let Ok(first) = service.resolve(principal_id, &request).await else {
        panic!("resolution failed");
    };
    assert!(first.granted);
    assert_eq!(first.source, DecisionSource::InheritedRoleGrant);

    let Ok(second) = service.resolve(principal_id, &request).await else {
        panic!("resolution failed");
    };
    assert_eq!(second.source, DecisionSource::Cache);

    assert_eq!(service.cache().invalidate(Some(principal_id)).await.ok(), Some(1));
    let Ok(third) = service.resolve(principal_id, &request).await else {
        panic!("resolution failed");
    };
    assert_eq!(third.source, DecisionSource::InheritedRoleGrant);
}

#[tokio::test]
async fn direct_rules_filter_by_key_and_order_by_priority() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let admin = PostgresPermissionAdminRepository::new(pool.clone());
    let repository = PostgresPermissionRepository::new(pool.clone());
    let principal_id = ensure_principal(&pool, false).await;
    let key = unique_key(PermissionAction::Read);
    let other_key = unique_key(PermissionAction::Read);

    for (key, is_granted, priority) in [(&key, true, 100), (&other_key, false, 500)] {
        let result = admin
            .upsert_user_permission(GrantUserPermissionInput {
                principal_id,
                key: key.clone(),
                scope: None,
                is_granted,
                priority,
                validity: ValidityWindow::starting(Utc::now() - Duration::minutes(1)),
                is_temporary: false,
                granted_by: None,
                grant_reason: None,
            })
            .await;
        assert!(result.is_ok());
    }

    let Ok(grants) = repository
        .list_direct_permissions(principal_id, &key, None)
        .await
    else {
        panic!("direct permissions should load");
    };
    assert_eq!(grants.len(), 1);
    assert!(grants[0].is_granted);
    assert_eq!(grants[0].priority, 100);

    assert_eq!(
        admin.remove_user_permission(principal_id, &key, None).await.ok(),
        Some(true)
    );
    assert_eq!(
        admin.remove_user_permission(principal_id, &key, None).await.ok(),
        Some(false)
    );
}

#[tokio::test]
async fn role_holders_exclude_expired_memberships() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let admin = PostgresPermissionAdminRepository::new(pool.clone());
    let role_id = ensure_role(&pool, "holder").await;
    let current = ensure_principal(&pool, false).await;
    let expired = ensure_principal(&pool, false).await;
    assign_role(&pool, current, role_id).await;

    let insert = sqlx::query(
        r#"
        INSERT INTO user_roles (principal_id, role_id, valid_from, valid_until)
        VALUES ($1, $2, NOW() - INTERVAL '2 days', NOW() - INTERVAL '1 day')
        "#,
    )
    .bind(expired.as_uuid())
    .bind(role_id.as_uuid())
    .execute(&pool)
    .await;
    assert!(insert.is_ok());

    let Ok(holders) = admin.list_role_holders(role_id).await else {
        panic!("holders should load");
    };
    assert_eq!(holders, vec![current]);
}

#[tokio::test]
async fn deactivated_permission_rejects_new_rules() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let admin = PostgresPermissionAdminRepository::new(pool.clone());
    let repository = PostgresPermissionRepository::new(pool.clone());
    let principal_id = ensure_principal(&pool, false).await;
    let role_id = ensure_role(&pool, "retired").await;
    let key = unique_key(PermissionAction::Export);

    let insert = sqlx::query(
        r#"
        INSERT INTO permissions (id, resource, action, scope, is_active)
        VALUES ($1, $2, $3, NULL, FALSE)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(key.resource())
    .bind(key.action().as_str())
    .execute(&pool)
    .await;
    assert!(insert.is_ok());

    let direct = admin
        .upsert_user_permission(GrantUserPermissionInput {
            principal_id,
            key: key.clone(),
            scope: None,
            is_granted: true,
            priority: 0,
            validity: ValidityWindow::starting(Utc::now() - Duration::minutes(1)),
            is_temporary: false,
            granted_by: None,
            grant_reason: None,
        })
        .await;
    assert!(matches!(direct, Err(AppError::Conflict(_))));

    let role = admin
        .upsert_role_permission(RolePermissionInput {
            role_id,
            key: key.clone(),
            scope: None,
            is_granted: true,
        })
        .await;
    assert!(matches!(role, Err(AppError::Conflict(_))));

    let Ok(grants) = repository
        .list_direct_permissions(principal_id, &key, None)
        .await
    else {
        panic!("direct permissions should load");
    };
    assert!(grants.is_empty());
}

#[tokio::test]
async fn hierarchy_insert_rejects_reverse_edge() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let admin = PostgresPermissionAdminRepository::new(pool.clone());
    let lower = ensure_role(&pool, "lower").await;
    let middle = ensure_role(&pool, "middle").await;
    let upper = ensure_role(&pool, "upper").await;

    for (child_role_id, parent_role_id) in [(lower, middle), (middle, upper)] {
        let result = admin
            .insert_role_hierarchy_edge(RoleHierarchyEdge {
                child_role_id,
                parent_role_id,
                inherit_permissions: true,
            })
            .await;
        assert!(result.is_ok());
    }

    let reverse = admin
        .insert_role_hierarchy_edge(RoleHierarchyEdge {
            child_role_id: upper,
            parent_role_id: lower,
            inherit_permissions: false,
        })
        .await;
    assert!(matches!(reverse, Err(AppError::Conflict(_))));
}
