use std::sync::Arc;

use orgaccess_application::{
    AuthorizationService, PermissionAdminService, PermissionCache, PermissionRepository,
    PrincipalContextService, PrincipalRepository, RowAccessService,
};
use orgaccess_core::AppError;
use orgaccess_infrastructure::{
    PostgresEntityAccessRepository, PostgresPermissionAdminRepository,
    PostgresPermissionRepository, PostgresPrincipalRepository,
};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

mod caches;

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let redis_client = config
        .redis_url
        .as_deref()
        .map(|redis_url| {
            redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))
        })
        .transpose()?;

    let principal_repository: Arc<dyn PrincipalRepository> =
        Arc::new(PostgresPrincipalRepository::new(pool.clone()));
    let permission_repository: Arc<dyn PermissionRepository> =
        Arc::new(PostgresPermissionRepository::new(pool.clone()));

    let permission_cache = PermissionCache::new(
        caches::build_permission_cache_repository(&pool, config),
        config.permission_cache_ttl_seconds,
    );
    let authorization_service = AuthorizationService::new(
        principal_repository.clone(),
        permission_repository.clone(),
        permission_cache,
    )
    .with_max_hierarchy_depth(config.role_hierarchy_max_depth);

    let principal_context_service =
        PrincipalContextService::new(principal_repository, permission_repository.clone())
            .with_context_cache(
                caches::build_principal_context_cache(redis_client.clone()),
                config.context_cache_ttl_seconds,
            )
            .with_max_hierarchy_depth(config.role_hierarchy_max_depth);

    let permission_admin_service = PermissionAdminService::new(
        authorization_service.clone(),
        principal_context_service.clone(),
        Arc::new(PostgresPermissionAdminRepository::new(pool.clone())),
        permission_repository,
    )
    .with_max_hierarchy_depth(config.role_hierarchy_max_depth);

    Ok(AppState {
        principal_context_service,
        authorization_service,
        row_access_service: RowAccessService::new(Arc::new(PostgresEntityAccessRepository::new(
            pool.clone(),
        ))),
        permission_admin_service,
        postgres_pool: pool,
        redis_client,
        frontend_url: config.frontend_url.clone(),
    })
}
