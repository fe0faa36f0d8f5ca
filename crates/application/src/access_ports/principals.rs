use async_trait::async_trait;
use orgaccess_core::AppResult;
use orgaccess_domain::{
    AccessScope, PermissionKey, PositionAssignment, PositionId, Principal, PrincipalId,
};

/// Module access entry attached to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAccessEntry {
    /// Position granting the access.
    pub position_id: PositionId,
    /// Resource and action made visible.
    pub key: PermissionKey,
    /// Explicit scope; the calculated scope applies when absent.
    pub scope: Option<AccessScope>,
}

/// Repository port for principal profiles and their organizational placement.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Finds the internal profile linked to an identity-provider subject.
    async fn find_principal_by_external_id(&self, external_id: &str)
    -> AppResult<Option<Principal>>;

    /// Finds a principal by internal id.
    async fn find_principal(&self, principal_id: PrincipalId) -> AppResult<Option<Principal>>;

    /// Lists assignments flagged active, joined to their position placement.
    async fn list_active_position_assignments(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<PositionAssignment>>;

    /// Lists module access entries of the given positions.
    async fn list_module_access_for_positions(
        &self,
        position_ids: &[PositionId],
    ) -> AppResult<Vec<ModuleAccessEntry>>;
}
