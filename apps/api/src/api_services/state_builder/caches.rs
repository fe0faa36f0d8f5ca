use std::sync::Arc;

use orgaccess_application::{PermissionCacheRepository, PrincipalContextCache};
use orgaccess_infrastructure::{
    InMemoryPermissionCacheRepository, InMemoryPrincipalContextCache,
    PostgresPermissionCacheRepository, RedisPrincipalContextCache,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::{ApiConfig, PermissionCacheStore};

pub(super) fn build_permission_cache_repository(
    pool: &PgPool,
    config: &ApiConfig,
) -> Arc<dyn PermissionCacheRepository> {
    match config.permission_cache_store {
        PermissionCacheStore::Postgres => {
            Arc::new(PostgresPermissionCacheRepository::new(pool.clone()))
        }
        PermissionCacheStore::Memory => {
            info!("permission decisions cached in process memory");
            Arc::new(InMemoryPermissionCacheRepository::new())
        }
    }
}

pub(super) fn build_principal_context_cache(
    redis_client: Option<redis::Client>,
) -> Arc<dyn PrincipalContextCache> {
    match redis_client {
        Some(redis_client) => Arc::new(RedisPrincipalContextCache::new(
            redis_client,
            "orgaccess:principal_context",
        )),
        None => Arc::new(InMemoryPrincipalContextCache::new()),
    }
}
