//! Shared in-memory fakes for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use orgaccess_core::{AppError, AppResult};
use orgaccess_domain::{
    AccessEntityType, AccessScope, EntityOwnership, PermissionAction, PermissionId,
    PermissionKey, PermissionRequest, PositionAssignment, PositionId, Principal, PrincipalContext,
    PrincipalId, RoleHierarchyEdge, RoleId, RolePermissionRule, UserPermissionGrant,
    UserRoleAssignment, ValidityWindow,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    EntityAccessRepository, GrantUserPermissionInput, ModuleAccessEntry, PermissionAdminRepository,
    PermissionCacheEntry, PermissionCacheRepository, PermissionRepository, PrincipalContextCache,
    PrincipalRepository, RolePermissionInput,
};

pub(crate) fn key(resource: &str, action: PermissionAction) -> PermissionKey {
    match PermissionKey::new(resource, action) {
        Ok(key) => key,
        Err(error) => panic!("invalid test key: {error}"),
    }
}

pub(crate) fn request(resource: &str, action: PermissionAction) -> PermissionRequest {
    PermissionRequest::new(key(resource, action))
}

pub(crate) fn open_window() -> ValidityWindow {
    ValidityWindow::starting(Utc::now() - Duration::days(1))
}

#[derive(Default)]
pub(crate) struct FakeAccessStore {
    pub(crate) principals: Mutex<Vec<Principal>>,
    pub(crate) assignments: Mutex<Vec<PositionAssignment>>,
    pub(crate) module_access: Mutex<Vec<ModuleAccessEntry>>,
    pub(crate) direct_permissions: Mutex<Vec<UserPermissionGrant>>,
    pub(crate) user_roles: Mutex<Vec<UserRoleAssignment>>,
    pub(crate) role_rules: Mutex<Vec<RolePermissionRule>>,
    pub(crate) edges: Mutex<Vec<RoleHierarchyEdge>>,
    pub(crate) entities: Mutex<HashMap<(AccessEntityType, Uuid), EntityOwnership>>,
    permission_reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl FakeAccessStore {
    pub(crate) async fn add_principal(&self, is_superadmin: bool) -> PrincipalId {
        let principal_id = PrincipalId::new();
        self.principals.lock().await.push(Principal {
            principal_id,
            external_id: format!("idp|{principal_id}"),
            is_superadmin,
            is_active: true,
        });
        principal_id
    }

    pub(crate) async fn grant_direct(
        &self,
        principal_id: PrincipalId,
        key: PermissionKey,
        is_granted: bool,
        priority: i32,
    ) {
        self.direct_permissions
            .lock()
            .await
            .push(UserPermissionGrant {
                principal_id,
                permission_id: PermissionId::new(),
                key,
                scope: None,
                is_granted,
                priority,
                validity: open_window(),
                is_temporary: false,
                granted_by: None,
                grant_reason: None,
            });
    }

    pub(crate) async fn assign_role(&self, principal_id: PrincipalId, role_id: RoleId) {
        self.user_roles.lock().await.push(UserRoleAssignment {
            principal_id,
            role_id,
            is_active: true,
            validity: open_window(),
        });
    }

    pub(crate) async fn add_role_rule(
        &self,
        role_id: RoleId,
        key: PermissionKey,
        scope: Option<AccessScope>,
        is_granted: bool,
    ) {
        self.role_rules.lock().await.push(RolePermissionRule {
            role_id,
            permission_id: PermissionId::new(),
            key,
            scope,
            is_granted,
        });
    }

    pub(crate) async fn link(&self, child_role_id: RoleId, parent_role_id: RoleId, inherit: bool) {
        self.edges.lock().await.push(RoleHierarchyEdge {
            child_role_id,
            parent_role_id,
            inherit_permissions: inherit,
        });
    }

    pub(crate) fn permission_reads(&self) -> usize {
        self.permission_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn read(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("fake store is offline".to_owned()));
        }

        self.permission_reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PrincipalRepository for FakeAccessStore {
    async fn find_principal_by_external_id(
        &self,
        external_id: &str,
    ) -> AppResult<Option<Principal>> {
        self.read()?;
        Ok(self
            .principals
            .lock()
            .await
            .iter()
            .find(|principal| principal.external_id == external_id)
            .cloned())
    }

    async fn find_principal(&self, principal_id: PrincipalId) -> AppResult<Option<Principal>> {
        self.read()?;
        Ok(self
            .principals
            .lock()
            .await
            .iter()
            .find(|principal| principal.principal_id == principal_id)
            .cloned())
    }

    async fn list_active_position_assignments(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<PositionAssignment>> {
        self.read()?;
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| assignment.principal_id == principal_id && assignment.is_active)
            .cloned()
            .collect())
    }

    async fn list_module_access_for_positions(
        &self,
        position_ids: &[PositionId],
    ) -> AppResult<Vec<ModuleAccessEntry>> {
        self.read()?;
        Ok(self
            .module_access
            .lock()
            .await
            .iter()
            .filter(|entry| position_ids.contains(&entry.position_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PermissionRepository for FakeAccessStore {
    async fn list_direct_permissions(
        &self,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<UserPermissionGrant>> {
        self.read()?;
        Ok(self
            .direct_permissions
            .lock()
            .await
            .iter()
            .filter(|grant| {
                grant.principal_id == principal_id
                    && &grant.key == key
                    && scope.is_none_or(|scope| grant.scope == Some(scope))
            })
            .cloned()
            .collect())
    }

    async fn list_user_roles(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        self.read()?;
        Ok(self
            .user_roles
            .lock()
            .await
            .iter()
            .filter(|role| role.principal_id == principal_id)
            .cloned()
            .collect())
    }

    async fn list_role_permission_rules(
        &self,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<Vec<RolePermissionRule>> {
        self.read()?;
        Ok(self
            .role_rules
            .lock()
            .await
            .iter()
            .filter(|rule| {
                rule.role_id == role_id
                    && &rule.key == key
                    && scope.is_none_or(|scope| rule.scope == Some(scope))
            })
            .cloned()
            .collect())
    }

    async fn list_granted_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RolePermissionRule>> {
        self.read()?;
        Ok(self
            .role_rules
            .lock()
            .await
            .iter()
            .filter(|rule| rule.is_granted && role_ids.contains(&rule.role_id))
            .cloned()
            .collect())
    }

    async fn list_parent_roles(&self, role_id: RoleId) -> AppResult<Vec<RoleHierarchyEdge>> {
        self.read()?;
        Ok(self
            .edges
            .lock()
            .await
            .iter()
            .filter(|edge| edge.child_role_id == role_id)
            .copied()
            .collect())
    }
}

#[async_trait]
impl EntityAccessRepository for FakeAccessStore {
    async fn load_entity_ownership(
        &self,
        entity_type: AccessEntityType,
        entity_id: Uuid,
    ) -> AppResult<Option<EntityOwnership>> {
        self.read()?;
        Ok(self
            .entities
            .lock()
            .await
            .get(&(entity_type, entity_id))
            .cloned())
    }
}

#[async_trait]
impl PermissionAdminRepository for FakeAccessStore {
    async fn upsert_user_permission(&self, input: GrantUserPermissionInput) -> AppResult<()> {
        let mut grants = self.direct_permissions.lock().await;
        grants.retain(|grant| {
            !(grant.principal_id == input.principal_id
                && grant.key == input.key
                && grant.scope == input.scope)
        });
        grants.push(UserPermissionGrant {
            principal_id: input.principal_id,
            permission_id: PermissionId::new(),
            key: input.key,
            scope: input.scope,
            is_granted: input.is_granted,
            priority: input.priority,
            validity: input.validity,
            is_temporary: input.is_temporary,
            granted_by: input.granted_by,
            grant_reason: input.grant_reason,
        });
        Ok(())
    }

    async fn remove_user_permission(
        &self,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<bool> {
        let mut grants = self.direct_permissions.lock().await;
        let before = grants.len();
        grants.retain(|grant| {
            !(grant.principal_id == principal_id && &grant.key == key && grant.scope == scope)
        });
        Ok(grants.len() != before)
    }

    async fn upsert_role_permission(&self, input: RolePermissionInput) -> AppResult<()> {
        let mut rules = self.role_rules.lock().await;
        rules.retain(|rule| {
            !(rule.role_id == input.role_id && rule.key == input.key && rule.scope == input.scope)
        });
        rules.push(RolePermissionRule {
            role_id: input.role_id,
            permission_id: PermissionId::new(),
            key: input.key,
            scope: input.scope,
            is_granted: input.is_granted,
        });
        Ok(())
    }

    async fn remove_role_permission(
        &self,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<bool> {
        let mut rules = self.role_rules.lock().await;
        let before = rules.len();
        rules.retain(|rule| !(rule.role_id == role_id && &rule.key == key && rule.scope == scope));
        Ok(rules.len() != before)
    }

    async fn list_role_holders(&self, role_id: RoleId) -> AppResult<Vec<PrincipalId>> {
        let now = Utc::now();
        Ok(self
            .user_roles
            .lock()
            .await
            .iter()
            .filter(|role| role.role_id == role_id && role.is_effective_at(now))
            .map(|role| role.principal_id)
            .collect())
    }

    async fn insert_role_hierarchy_edge(&self, edge: RoleHierarchyEdge) -> AppResult<()> {
        self.edges.lock().await.push(edge);
        Ok(())
    }

    async fn remove_role_hierarchy_edge(
        &self,
        child_role_id: RoleId,
        parent_role_id: RoleId,
    ) -> AppResult<bool> {
        let mut edges = self.edges.lock().await;
        let before = edges.len();
        edges.retain(|edge| {
            !(edge.child_role_id == child_role_id && edge.parent_role_id == parent_role_id)
        });
        Ok(edges.len() != before)
    }
}

#[derive(Default)]
pub(crate) struct FakeCacheRepository {
    entries: Mutex<HashMap<(PrincipalId, String), PermissionCacheEntry>>,
}

impl FakeCacheRepository {
    pub(crate) async fn insert(&self, entry: PermissionCacheEntry) {
        self.entries
            .lock()
            .await
            .insert((entry.principal_id, entry.cache_key.clone()), entry);
    }

    pub(crate) async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl PermissionCacheRepository for FakeCacheRepository {
    async fn find_entry(
        &self,
        principal_id: PrincipalId,
        cache_key: &str,
    ) -> AppResult<Option<PermissionCacheEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(&(principal_id, cache_key.to_owned()))
            .cloned())
    }

    async fn upsert_entry(&self, entry: PermissionCacheEntry) -> AppResult<()> {
        self.insert(entry).await;
        Ok(())
    }

    async fn invalidate(&self, principal_id: Option<PrincipalId>) -> AppResult<u64> {
        let mut invalidated = 0;
        for entry in self.entries.lock().await.values_mut() {
            if principal_id.is_none_or(|principal_id| entry.principal_id == principal_id)
                && entry.is_valid
            {
                entry.is_valid = false;
                invalidated += 1;
            }
        }
        Ok(invalidated)
    }
}

#[derive(Default)]
pub(crate) struct FakeContextCache {
    pub(crate) contexts: Mutex<HashMap<PrincipalId, PrincipalContext>>,
}

#[async_trait]
impl PrincipalContextCache for FakeContextCache {
    async fn get_context(&self, principal_id: PrincipalId) -> AppResult<Option<PrincipalContext>> {
        Ok(self.contexts.lock().await.get(&principal_id).cloned())
    }

    async fn set_context(
        &self,
        principal_id: PrincipalId,
        context: &PrincipalContext,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.contexts
            .lock()
            .await
            .insert(principal_id, context.clone());
        Ok(())
    }

    async fn invalidate_context(&self, principal_id: Option<PrincipalId>) -> AppResult<()> {
        let mut contexts = self.contexts.lock().await;
        match principal_id {
            Some(principal_id) => {
                contexts.remove(&principal_id);
            }
            None => contexts.clear(),
        }
        Ok(())
    }
}
