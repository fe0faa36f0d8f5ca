use std::collections::HashMap;

use async_trait::async_trait;
use orgaccess_application::{PermissionCacheEntry, PermissionCacheRepository};
use orgaccess_core::AppResult;
use orgaccess_domain::PrincipalId;
use tokio::sync::RwLock;

/// Process-local permission decision cache for single-instance deployments.
#[derive(Default)]
pub struct InMemoryPermissionCacheRepository {
    entries: RwLock<HashMap<(PrincipalId, String), PermissionCacheEntry>>,
}

impl InMemoryPermissionCacheRepository {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionCacheRepository for InMemoryPermissionCacheRepository {
    async fn find_entry(
        &self,
        principal_id: PrincipalId,
        cache_key: &str,
    ) -> AppResult<Option<PermissionCacheEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(principal_id, cache_key.to_owned()))
            .cloned())
    }

    async fn upsert_entry(&self, entry: PermissionCacheEntry) -> AppResult<()> {
        self.entries
            .write()
            .await
            .insert((entry.principal_id, entry.cache_key.clone()), entry);

        Ok(())
    }

    async fn invalidate(&self, principal_id: Option<PrincipalId>) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let mut invalidated = 0;

        for entry in entries.values_mut().filter(|entry| {
            entry.is_valid
                && principal_id.is_none_or(|principal_id| entry.principal_id == principal_id)
        }) {
            entry.is_valid = false;
            invalidated += 1;
        }

        Ok(invalidated)
    }
}
