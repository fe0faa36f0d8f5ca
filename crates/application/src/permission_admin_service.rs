use std::sync::Arc;

use orgaccess_core::{AppError, AppResult};
use orgaccess_domain::{
    AccessScope, PermissionAction, PermissionKey, PermissionRequest, PrincipalContext,
    PrincipalId, RoleHierarchyEdge, RoleId,
};
use tracing::info;

use crate::role_graph::{EdgeFilter, walk_ancestors};
use crate::{
    AuthorizationService, DEFAULT_MAX_ROLE_HIERARCHY_DEPTH, GrantUserPermissionInput,
    PermissionAdminRepository, PermissionRepository, PrincipalContextService, RolePermissionInput,
};


const ADMIN_RESOURCE: &str = "permission";

/// Permission writes followed by the cache invalidation they require.
#[derive(Clone)]
pub struct PermissionAdminService {
    authorization_service: AuthorizationService,
    context_service: PrincipalContextService,
    admin_repository: Arc<dyn PermissionAdminRepository>,
    permission_repository: Arc<dyn PermissionRepository>,
    max_hierarchy_depth: usize,
}

impl PermissionAdminService {
    /// Creates a new administration service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        context_service: PrincipalContextService,
        admin_repository: Arc<dyn PermissionAdminRepository>,
        permission_repository: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            authorization_service,
            context_service,
            admin_repository,
            permission_repository,
            max_hierarchy_depth: DEFAULT_MAX_ROLE_HIERARCHY_DEPTH,
        }
    }

    /// Overrides the maximum role chain length accepted by [`Self::link_roles`].
    #[must_use]
    pub fn with_max_hierarchy_depth(mut self, max_hierarchy_depth: usize) -> Self {
        self.max_hierarchy_depth = max_hierarchy_depth;
        self
    }

    /// Grants or denies a permission directly to a principal.
    pub async fn grant_user_permission(
        &self,
        actor: &PrincipalContext,
        mut input: GrantUserPermissionInput,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;

        if let Some(valid_until) = input.validity.valid_until
            && valid_until <= input.validity.valid_from
        {
            return Err(AppError::Validation(
                "grant must end after it starts".to_owned(),
            ));
        }
        if input.is_temporary && input.validity.valid_until.is_none() {
            return Err(AppError::Validation(
                "temporary grants require an end".to_owned(),
            ));
        }

        input.granted_by = actor.principal_id();
        let principal_id = input.principal_id;
        let key = input.key.clone();
        let is_granted = input.is_granted;

        self.admin_repository.upsert_user_permission(input).await?;
        self.invalidate_principal(principal_id).await?;

        info!(
            actor = ?actor.principal_id(),
            %principal_id,
            %key,
            is_granted,
            "direct permission written"
        );

        Ok(())
    }

    /// Removes a direct grant or deny.
    pub async fn revoke_user_permission(
        &self,
        actor: &PrincipalContext,
        principal_id: PrincipalId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;

        if !self
            .admin_repository
            .remove_user_permission(principal_id, key, scope)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "principal '{principal_id}' has no direct rule for '{key}'"
            )));
        }
        self.invalidate_principal(principal_id).await?;

        info!(actor = ?actor.principal_id(), %principal_id, %key, "direct permission revoked");

        Ok(())
    }

    /// Grants or denies a permission on a role and invalidates its holders.
    pub async fn set_role_permission(
        &self,
        actor: &PrincipalContext,
        input: RolePermissionInput,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;

        let role_id = input.role_id;
        let key = input.key.clone();
        let is_granted = input.is_granted;
        let holders = self.admin_repository.list_role_holders(role_id).await?;

        self.admin_repository.upsert_role_permission(input).await?;
        for principal_id in &holders {
            self.invalidate_principal(*principal_id).await?;
        }

        info!(
            actor = ?actor.principal_id(),
            %role_id,
            %key,
            is_granted,
            holders = holders.len(),
            "role permission written"
        );

        Ok(())
    }

    /// Removes a role rule and invalidates the role's holders.
    pub async fn remove_role_permission(
        &self,
        actor: &PrincipalContext,
        role_id: RoleId,
        key: &PermissionKey,
        scope: Option<AccessScope>,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;

        let holders = self.admin_repository.list_role_holders(role_id).await?;
        if !self
            .admin_repository
            .remove_role_permission(role_id, key, scope)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' has no rule for '{key}'"
            )));
        }
        for principal_id in &holders {
            self.invalidate_principal(*principal_id).await?;
        }

        info!(
            actor = ?actor.principal_id(),
            %role_id,
            %key,
            holders = holders.len(),
            "role permission removed"
        );

        Ok(())
    }

    /// Makes `parent_role_id` a parent of `child_role_id`.
    ///
    /// Rejects edges that would close a cycle or produce a chain longer than
    /// the configured maximum.
    pub async fn link_roles(
        &self,
        actor: &PrincipalContext,
        child_role_id: RoleId,
        parent_role_id: RoleId,
        inherit_permissions: bool,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;

        if child_role_id == parent_role_id {
            return Err(AppError::Conflict(format!(
                "role '{child_role_id}' cannot inherit from itself"
            )));
        }

        let ancestors = walk_ancestors(
            self.permission_repository.as_ref(),
            &[parent_role_id],
            EdgeFilter::All,
            self.max_hierarchy_depth,
        )
        .await?;

        if ancestors.contains(child_role_id) {
            return Err(AppError::Conflict(format!(
                "linking role '{child_role_id}' under '{parent_role_id}' would create a cycle"
            )));
        }
        if ancestors.was_truncated() || ancestors.max_depth() + 1 > self.max_hierarchy_depth {
            return Err(AppError::Validation(format!(
                "role hierarchy would exceed the maximum depth of {}",
                self.max_hierarchy_depth
            )));
        }

        self.admin_repository
            .insert_role_hierarchy_edge(RoleHierarchyEdge {
                child_role_id,
                parent_role_id,
                inherit_permissions,
            })
            .await?;
        self.invalidate_everyone().await?;

        info!(
            actor = ?actor.principal_id(),
            %child_role_id,
            %parent_role_id,
            inherit_permissions,
            "role hierarchy edge created"
        );

        Ok(())
    }

    /// Removes a hierarchy edge.
    pub async fn unlink_roles(
        &self,
        actor: &PrincipalContext,
        child_role_id: RoleId,
        parent_role_id: RoleId,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;

        if !self
            .admin_repository
            .remove_role_hierarchy_edge(child_role_id, parent_role_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "role '{child_role_id}' does not inherit from '{parent_role_id}'"
            )));
        }
        self.invalidate_everyone().await?;

        info!(
            actor = ?actor.principal_id(),
            %child_role_id,
            %parent_role_id,
            "role hierarchy edge removed"
        );

        Ok(())
    }

    /// Invalidates cached decisions and contexts; every principal when `None`.
    pub async fn invalidate_cache(
        &self,
        actor: &PrincipalContext,
        principal_id: Option<PrincipalId>,
    ) -> AppResult<u64> {
        self.require_admin(actor).await?;

        let invalidated = self
            .authorization_service
            .cache()
            .invalidate(principal_id)
            .await?;
        self.context_service.invalidate_context(principal_id).await?;

        info!(
            actor = ?actor.principal_id(),
            principal_id = ?principal_id,
            invalidated,
            "permission cache invalidated on request"
        );

        Ok(invalidated)
    }

    async fn require_admin(&self, actor: &PrincipalContext) -> AppResult<()> {
        let request = PermissionRequest::new(PermissionKey::new(
            ADMIN_RESOURCE,
            PermissionAction::Assign,
        )?);
        self.authorization_service
            .require_permission(actor, &request)
            .await
    }

    async fn invalidate_principal(&self, principal_id: PrincipalId) -> AppResult<()> {
        self.authorization_service
            .cache()
            .invalidate(Some(principal_id))
            .await?;
        self.context_service
            .invalidate_context(Some(principal_id))
            .await
    }

    async fn invalidate_everyone(&self) -> AppResult<()> {
        self.authorization_service.cache().invalidate(None).await?;
        self.context_service.invalidate_context(None).await
    }
}
