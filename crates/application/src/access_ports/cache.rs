use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgaccess_core::AppResult;
use orgaccess_domain::{PrincipalContext, PrincipalId};

/// Persisted memoization of one permission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCacheEntry {
    /// Principal the decision belongs to.
    pub principal_id: PrincipalId,
    /// Deterministic key of the decided request.
    pub cache_key: String,
    /// Encoded decision.
    pub payload: String,
    /// Decision timestamp.
    pub computed_at: DateTime<Utc>,
    /// Instant after which the entry is stale.
    pub expires_at: DateTime<Utc>,
    /// Cleared by invalidation.
    pub is_valid: bool,
}

/// Storage port for the permission decision cache.
#[async_trait]
pub trait PermissionCacheRepository: Send + Sync {
    /// Returns the stored entry for a key, whatever its validity.
    async fn find_entry(
        &self,
        principal_id: PrincipalId,
        cache_key: &str,
    ) -> AppResult<Option<PermissionCacheEntry>>;

    /// Inserts or replaces the entry for `(principal_id, cache_key)`.
    async fn upsert_entry(&self, entry: PermissionCacheEntry) -> AppResult<()>;

    /// Marks entries invalid without deleting them; every principal when `None`.
    ///
    /// Returns the number of entries flipped.
    async fn invalidate(&self, principal_id: Option<PrincipalId>) -> AppResult<u64>;
}

/// Optional short-term cache for resolved principal contexts.
#[async_trait]
pub trait PrincipalContextCache: Send + Sync {
    /// Returns the cached context of a principal.
    async fn get_context(&self, principal_id: PrincipalId) -> AppResult<Option<PrincipalContext>>;

    /// Stores a context with ttl.
    async fn set_context(
        &self,
        principal_id: PrincipalId,
        context: &PrincipalContext,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Drops cached contexts; every principal when `None`.
    async fn invalidate_context(&self, principal_id: Option<PrincipalId>) -> AppResult<()>;
}
