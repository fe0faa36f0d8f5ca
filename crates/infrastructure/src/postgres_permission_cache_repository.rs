use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgaccess_application::{PermissionCacheEntry, PermissionCacheRepository};
use orgaccess_core::AppResult;
use orgaccess_domain::PrincipalId;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::storage_errors::database_error;

/// PostgreSQL-backed permission decision cache.
///
/// Writes are upserts keyed by `(principal_id, cache_key)`; concurrent writers
/// for the same key resolve last-writer-wins.
#[derive(Clone)]
pub struct PostgresPermissionCacheRepository {
    pool: PgPool,
}

impl PostgresPermissionCacheRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CacheEntryRow {
    principal_id: Uuid,
    cache_key: String,
    payload: String,
    computed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_valid: bool,
}

#[async_trait]
impl PermissionCacheRepository for PostgresPermissionCacheRepository {
    async fn find_entry(
        &self,
        principal_id: PrincipalId,
        cache_key: &str,
    ) -> AppResult<Option<PermissionCacheEntry>> {
        let row = sqlx::query_as::<_, CacheEntryRow>(
            r#"
            SELECT principal_id, cache_key, payload, computed_at, expires_at, is_valid
            FROM permission_cache
            WHERE principal_id = $1
                AND cache_key = $2
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| database_error("failed to read permission cache entry", error))?;

        Ok(row.map(|row| PermissionCacheEntry {
            principal_id: PrincipalId::from_uuid(row.principal_id),
            cache_key: row.cache_key,
            payload: row.payload,
            computed_at: row.computed_at,
            expires_at: row.expires_at,
            is_valid: row.is_valid,
        }))
    }

    async fn upsert_entry(&self, entry: PermissionCacheEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permission_cache (
                principal_id, cache_key, payload, computed_at, expires_at, is_valid
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (principal_id, cache_key)
            DO UPDATE SET
                payload = EXCLUDED.payload,
                computed_at = EXCLUDED.computed_at,
                expires_at = EXCLUDED.expires_at,
                is_valid = EXCLUDED.is_valid
            "#,
        )
        .bind(entry.principal_id.as_uuid())
        .bind(entry.cache_key)
        .bind(entry.payload)
        .bind(entry.computed_at)
        .bind(entry.expires_at)
        .bind(entry.is_valid)
        .execute(&self.pool)
        .await
        .map_err(|error| database_error("failed to write permission cache entry", error))?;

        Ok(())
    }

    async fn invalidate(&self, principal_id: Option<PrincipalId>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE permission_cache
            SET is_valid = FALSE
            WHERE is_valid
                AND ($1::UUID IS NULL OR principal_id = $1)
            "#,
        )
        .bind(principal_id.map(|principal_id| principal_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| database_error("failed to invalidate permission cache", error))?;

        Ok(result.rows_affected())
    }
}
