use async_trait::async_trait;
use orgaccess_core::AppResult;
use orgaccess_domain::{AccessEntityType, EntityOwnership};
use uuid::Uuid;

/// Single-row lookups backing record-level access checks.
#[async_trait]
pub trait EntityAccessRepository: Send + Sync {
    /// Loads ownership columns of one record; `None` when it does not exist.
    async fn load_entity_ownership(
        &self,
        entity_type: AccessEntityType,
        entity_id: Uuid,
    ) -> AppResult<Option<EntityOwnership>>;
}
