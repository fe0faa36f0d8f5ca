use std::sync::Arc;

use chrono::{Duration, Utc};
use orgaccess_core::AppResult;
use orgaccess_domain::{PermissionRequest, PrincipalId};
use tracing::{debug, warn};

use crate::{PermissionCacheEntry, PermissionCacheRepository};

/// Default lifetime of a cached permission decision.
pub const DEFAULT_PERMISSION_CACHE_TTL_SECONDS: u32 = 300;

const ANY_SCOPE_PLACEHOLDER: &str = "ANY";
const GRANTED_PAYLOAD: &str = "granted";
const DENIED_PAYLOAD: &str = "denied";

/// Time-boxed, invalidation-aware memoization of permission decisions.
///
/// Reads and writes never fail a decision: storage errors are logged and
/// treated as a miss or a skipped write.
#[derive(Clone)]
pub struct PermissionCache {
    repository: Arc<dyn PermissionCacheRepository>,
    ttl_seconds: u32,
}

impl PermissionCache {
    /// Creates a cache over a storage adapter. A zero ttl disables writes.
    #[must_use]
    pub fn new(repository: Arc<dyn PermissionCacheRepository>, ttl_seconds: u32) -> Self {
        Self {
            repository,
            ttl_seconds,
        }
    }

    /// Builds the deterministic cache key of a request.
    #[must_use]
    pub fn cache_key(principal_id: PrincipalId, request: &PermissionRequest) -> String {
        format!(
            "{principal_id}:{}:{}:{}",
            request.key().resource(),
            request.key().action().as_str(),
            request
                .scope()
                .map_or(ANY_SCOPE_PLACEHOLDER, |scope| scope.as_str())
        )
    }

    /// Returns a cached decision if a valid, unexpired entry exists.
    pub async fn lookup(
        &self,
        principal_id: PrincipalId,
        request: &PermissionRequest,
    ) -> Option<bool> {
        let cache_key = Self::cache_key(principal_id, request);
        let entry = match self.repository.find_entry(principal_id, &cache_key).await {
            Ok(entry) => entry?,
            Err(error) => {
                warn!(
                    %principal_id,
                    cache_key = %cache_key,
                    %error,
                    "permission cache read failed"
                );
                return None;
            }
        };

        if !entry.is_valid || entry.expires_at <= Utc::now() {
            return None;
        }

        match entry.payload.as_str() {
            GRANTED_PAYLOAD => Some(true),
            DENIED_PAYLOAD => Some(false),
            other => {
                warn!(
                    %principal_id,
                    cache_key = %cache_key,
                    payload = other,
                    "discarding malformed permission cache entry"
                );
                None
            }
        }
    }

    /// Stores a fully resolved decision, refreshing validity and expiry.
    pub async fn store(
        &self,
        principal_id: PrincipalId,
        request: &PermissionRequest,
        granted: bool,
    ) {
        if self.ttl_seconds == 0 {
            return;
        }

        let computed_at = Utc::now();
        let entry = PermissionCacheEntry {
            principal_id,
            cache_key: Self::cache_key(principal_id, request),
            payload: if granted { GRANTED_PAYLOAD } else { DENIED_PAYLOAD }.to_owned(),
            computed_at,
            expires_at: computed_at + Duration::seconds(i64::from(self.ttl_seconds)),
            is_valid: true,
        };

        if let Err(error) = self.repository.upsert_entry(entry).await {
            warn!(%principal_id, %error, "permission cache write failed");
        }
    }

    /// Invalidates one principal's entries, or every entry when `None`.
    pub async fn invalidate(&self, principal_id: Option<PrincipalId>) -> AppResult<u64> {
        let invalidated = self.repository.invalidate(principal_id).await?;
        debug!(
            principal_id = ?principal_id,
            invalidated,
            "permission cache invalidated"
        );

        Ok(invalidated)
    }
}
