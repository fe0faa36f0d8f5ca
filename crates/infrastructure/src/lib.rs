//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_permission_cache_repository;
mod in_memory_principal_context_cache;
mod postgres_entity_access_repository;
mod postgres_permission_admin_repository;
mod postgres_permission_cache_repository;
mod postgres_permission_repository;
mod postgres_principal_repository;
mod redis_principal_context_cache;
mod storage_errors;

pub use in_memory_permission_cache_repository::InMemoryPermissionCacheRepository;
pub use in_memory_principal_context_cache::InMemoryPrincipalContextCache;
pub use postgres_entity_access_repository::PostgresEntityAccessRepository;
pub use postgres_permission_admin_repository::PostgresPermissionAdminRepository;
pub use postgres_permission_cache_repository::PostgresPermissionCacheRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_principal_repository::PostgresPrincipalRepository;
pub use redis_principal_context_cache::RedisPrincipalContextCache;
