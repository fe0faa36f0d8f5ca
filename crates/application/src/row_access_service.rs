use std::str::FromStr;
use std::sync::Arc;

use orgaccess_core::AppResult;
use orgaccess_domain::{
    AccessEntityType, AccessScope, PermissionAction, PermissionKey, PrincipalContext, RowFilter,
    scope_admits_record,
};
use tracing::debug;
use uuid::Uuid;

use crate::EntityAccessRepository;

/// Row filters for list queries and record-level checks for single entities.
#[derive(Clone)]
pub struct RowAccessService {
    entity_repository: Arc<dyn EntityAccessRepository>,
}

impl RowAccessService {
    /// Creates a new row access service.
    #[must_use]
    pub fn new(entity_repository: Arc<dyn EntityAccessRepository>) -> Self {
        Self { entity_repository }
    }

    /// Returns the visibility filter for a key; `None` means unrestricted.
    #[must_use]
    pub fn build_filter(&self, context: &PrincipalContext, key: &PermissionKey) -> Option<RowFilter> {
        RowFilter::for_context(context, key)
    }

    /// Decides whether the context may act on one record.
    ///
    /// Unsupported entity types, malformed ids and missing records are denied;
    /// only storage failures are errors.
    pub async fn can_access(
        &self,
        context: &PrincipalContext,
        entity_type: &str,
        entity_id: &str,
        action: PermissionAction,
    ) -> AppResult<bool> {
        if context.is_superadmin() {
            return Ok(true);
        }

        let Ok(entity_type) = AccessEntityType::from_str(entity_type) else {
            debug!(entity_type, "record access denied for unsupported entity type");
            return Ok(false);
        };
        let Ok(entity_id) = Uuid::parse_str(entity_id) else {
            debug!(entity_type = entity_type.as_str(), entity_id, "record access denied for malformed id");
            return Ok(false);
        };

        if !context.is_provisioned() {
            return Ok(false);
        }

        let key = PermissionKey::new(entity_type.as_str(), action)?;
        let scope = context.scope_for(&key);
        if scope == AccessScope::All {
            return Ok(true);
        }

        let Some(ownership) = self
            .entity_repository
            .load_entity_ownership(entity_type, entity_id)
            .await?
        else {
            debug!(
                entity_type = entity_type.as_str(),
                %entity_id,
                "record access denied for missing entity"
            );
            return Ok(false);
        };

        Ok(scope_admits_record(context, scope, &ownership))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use orgaccess_core::AppError;
    use orgaccess_domain::{
        AccessEntityType, AccessScope, DepartmentId, EntityOwnership, OrganizationMemberships,
        PermissionAction, PrincipalContext, PrincipalId, SchoolId,
    };
    use uuid::Uuid;

    use crate::test_support::{FakeAccessStore, key};

    use super::RowAccessService;

    fn context(
        principal_id: PrincipalId,
        is_superadmin: bool,
        scope: AccessScope,
        memberships: OrganizationMemberships,
    ) -> PrincipalContext {
        let mut scopes = BTreeMap::new();
        scopes.insert(key("position", PermissionAction::Update), scope);
        scopes.insert(key("department", PermissionAction::Read), scope);
        PrincipalContext::new(principal_id, is_superadmin, scope, memberships, scopes)
    }

    async fn store_with(
        entity_type: AccessEntityType,
        ownership: EntityOwnership,
    ) -> (Arc<FakeAccessStore>, Uuid) {
        let store = Arc::new(FakeAccessStore::default());
        let entity_id = Uuid::new_v4();
        store
            .entities
            .lock()
            .await
            .insert((entity_type, entity_id), ownership);
        (store, entity_id)
    }

    #[test]
    fn superadmin_filter_is_unrestricted_for_every_key() {
        let service = RowAccessService::new(Arc::new(FakeAccessStore::default()));
        let context = context(
            PrincipalId::new(),
            true,
            AccessScope::Own,
            OrganizationMemberships::default(),
        );

        for action in PermissionAction::all() {
            assert_eq!(service.build_filter(&context, &key("anything", *action)), None);
        }
    }

    #[tokio::test]
    async fn school_scope_admits_records_of_member_schools() {
        let school_id = SchoolId::new();
        let (store, entity_id) = store_with(
            AccessEntityType::Position,
            EntityOwnership {
                school_id: Some(school_id),
                ..EntityOwnership::default()
            },
        )
        .await;
        let service = RowAccessService::new(store);

        let mut memberships = OrganizationMemberships::default();
        memberships.school_ids.insert(school_id);
        let member = context(PrincipalId::new(), false, AccessScope::School, memberships);
        let outsider = context(
            PrincipalId::new(),
            false,
            AccessScope::School,
            OrganizationMemberships::default(),
        );
        let id = entity_id.to_string();

        let allowed = service
            .can_access(&member, "position", &id, PermissionAction::Update)
            .await;
        assert_eq!(allowed.ok(), Some(true));
        let denied = service
            .can_access(&outsider, "position", &id, PermissionAction::Update)
            .await;
        assert_eq!(denied.ok(), Some(false));
    }

    #[tokio::test]
    async fn department_scope_falls_back_to_ownership() {
        let principal_id = PrincipalId::new();
        let (store, entity_id) = store_with(
            AccessEntityType::Position,
            EntityOwnership {
                owner_id: Some(principal_id),
                department_id: Some(DepartmentId::new()),
                ..EntityOwnership::default()
            },
        )
        .await;
        let service = RowAccessService::new(store);
        let owner = context(
            principal_id,
            false,
            AccessScope::Department,
            OrganizationMemberships::default(),
        );

        let allowed = service
            .can_access(&owner, "position", &entity_id.to_string(), PermissionAction::Update)
            .await;
        assert_eq!(allowed.ok(), Some(true));
    }

    #[tokio::test]
    async fn own_scope_requires_ownership_and_defaults_for_unknown_keys() {
        let (store, entity_id) = store_with(
            AccessEntityType::PositionAssignment,
            EntityOwnership {
                owner_id: Some(PrincipalId::new()),
                ..EntityOwnership::default()
            },
        )
        .await;
        let service = RowAccessService::new(store);
        let stranger = context(
            PrincipalId::new(),
            false,
            AccessScope::All,
            OrganizationMemberships::default(),
        );

        let denied = service
            .can_access(
                &stranger,
                "position-assignment",
                &entity_id.to_string(),
                PermissionAction::Delete,
            )
            .await;
        assert_eq!(denied.ok(), Some(false));
    }

    #[tokio::test]
    async fn unsupported_or_missing_entities_are_denied() {
        let store = Arc::new(FakeAccessStore::default());
        let service = RowAccessService::new(store);
        let context = context(
            PrincipalId::new(),
            false,
            AccessScope::Department,
            OrganizationMemberships::default(),
        );
        let id = Uuid::new_v4().to_string();

        for (entity_type, entity_id) in [
            ("invoice", id.as_str()),
            ("position", "not-a-uuid"),
            ("department", id.as_str()),
        ] {
            let decision = service
                .can_access(&context, entity_type, entity_id, PermissionAction::Read)
                .await;
            assert_eq!(decision.ok(), Some(false), "{entity_type}/{entity_id}");
        }
    }

    #[tokio::test]
    async fn all_scope_skips_entity_lookup() {
        let store = Arc::new(FakeAccessStore::default());
        store.set_unavailable(true);
        let service = RowAccessService::new(store);
        let context = context(
            PrincipalId::new(),
            false,
            AccessScope::All,
            OrganizationMemberships::default(),
        );

        let decision = service
            .can_access(
                &context,
                "department",
                &Uuid::new_v4().to_string(),
                PermissionAction::Read,
            )
            .await;
        assert_eq!(decision.ok(), Some(true));
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let store = Arc::new(FakeAccessStore::default());
        store.set_unavailable(true);
        let service = RowAccessService::new(store);
        let context = context(
            PrincipalId::new(),
            false,
            AccessScope::School,
            OrganizationMemberships::default(),
        );

        let result = service
            .can_access(
                &context,
                "position",
                &Uuid::new_v4().to_string(),
                PermissionAction::Update,
            )
            .await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }
}
