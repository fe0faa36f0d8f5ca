use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use orgaccess_application::PrincipalContextCache;
use orgaccess_core::AppResult;
use orgaccess_domain::{PrincipalContext, PrincipalId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ContextCacheEntry {
    context: PrincipalContext,
    expires_at: Instant,
}

/// In-memory cache adapter for resolved principal contexts.
#[derive(Default)]
pub struct InMemoryPrincipalContextCache {
    entries: RwLock<HashMap<PrincipalId, ContextCacheEntry>>,
}

impl InMemoryPrincipalContextCache {
    /// Creates an empty in-memory context cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalContextCache for InMemoryPrincipalContextCache {
    async fn get_context(&self, principal_id: PrincipalId) -> AppResult<Option<PrincipalContext>> {
        {
            let entries = self.entries.read().await;
            match entries.get(&principal_id) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.context.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&principal_id)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&principal_id);
        }

        Ok(None)
    }

    async fn set_context(
        &self,
        principal_id: PrincipalId,
        context: &PrincipalContext,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        self.entries.write().await.insert(
            principal_id,
            ContextCacheEntry {
                context: context.clone(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn invalidate_context(&self, principal_id: Option<PrincipalId>) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        match principal_id {
            Some(principal_id) => {
                entries.remove(&principal_id);
            }
            None => entries.clear(),
        }

        Ok(())
    }
}
