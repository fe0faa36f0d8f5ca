use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use orgaccess_core::{AppResult, ExternalIdentity};
use orgaccess_domain::{
    AccessScope, DepartmentId, OrganizationMemberships, PermissionAction, PermissionKey,
    PositionAssignment, PositionId, Principal, PrincipalContext, PrincipalId, RoleId, SchoolId,
    calculate_scope, merge_permission_scope,
};
use tracing::{debug, info, warn};

use crate::role_graph::{EdgeFilter, walk_ancestors};
use crate::{
    DEFAULT_MAX_ROLE_HIERARCHY_DEPTH, PermissionRepository, PrincipalContextCache,
    PrincipalRepository,
};


/// Default lifetime of a cached principal context.
pub const DEFAULT_CONTEXT_CACHE_TTL_SECONDS: u32 = 60;

/// Actions and scopes granted on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAccessSummary {
    /// Resource name.
    pub module: String,
    /// Granted actions with their scope, ordered by action.
    pub permissions: Vec<(PermissionAction, AccessScope)>,
}

/// "What can I do" summary of a resolved context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAccessSummary {
    /// Internal principal id; `None` when unprovisioned.
    pub principal_id: Option<PrincipalId>,
    /// Superadmin flag.
    pub is_superadmin: bool,
    /// Scope calculated from occupied positions.
    pub effective_scope: AccessScope,
    /// Occupied positions.
    pub position_ids: Vec<PositionId>,
    /// Departments of occupied positions.
    pub department_ids: Vec<DepartmentId>,
    /// Schools of occupied positions.
    pub school_ids: Vec<SchoolId>,
    /// Per-resource permissions, sorted by resource name.
    pub modules: Vec<ModuleAccessSummary>,
}

/// Derives immutable principal contexts from organizational placement and roles.
#[derive(Clone)]
pub struct PrincipalContextService {
    principal_repository: Arc<dyn PrincipalRepository>,
    permission_repository: Arc<dyn PermissionRepository>,
    context_cache: Option<Arc<dyn PrincipalContextCache>>,
    context_cache_ttl_seconds: u32,
    max_hierarchy_depth: usize,
}

impl PrincipalContextService {
    /// Creates a resolver without a context cache.
    #[must_use]
    pub fn new(
        principal_repository: Arc<dyn PrincipalRepository>,
        permission_repository: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            principal_repository,
            permission_repository,
            context_cache: None,
            context_cache_ttl_seconds: DEFAULT_CONTEXT_CACHE_TTL_SECONDS,
            max_hierarchy_depth: DEFAULT_MAX_ROLE_HIERARCHY_DEPTH,
        }
    }

    /// Enables short-term context caching. A zero ttl leaves caching disabled.
    #[must_use]
    pub fn with_context_cache(
        mut self,
        context_cache: Arc<dyn PrincipalContextCache>,
        ttl_seconds: u32,
    ) -> Self {
        if ttl_seconds > 0 {
            self.context_cache = Some(context_cache);
            self.context_cache_ttl_seconds = ttl_seconds;
        }
        self
    }

    /// Overrides the role-hierarchy walk bound.
    #[must_use]
    pub fn with_max_hierarchy_depth(mut self, max_hierarchy_depth: usize) -> Self {
        self.max_hierarchy_depth = max_hierarchy_depth;
        self
    }

    /// Resolves the context of an authenticated identity.
    ///
    /// Identities without an active internal profile get the least-privilege
    /// unprovisioned context; storage failures propagate.
    pub async fn resolve_context(&self, identity: &ExternalIdentity) -> AppResult<PrincipalContext> {
        self.resolve_context_for_subject(identity.subject()).await
    }

    /// Resolves the context of an identity-provider subject.
    pub async fn resolve_context_for_subject(&self, subject: &str) -> AppResult<PrincipalContext> {
        let principal = self
            .principal_repository
            .find_principal_by_external_id(subject)
            .await?;

        match principal {
            Some(principal) if principal.is_active => self.context_for(&principal).await,
            Some(principal) => {
                info!(principal_id = %principal.principal_id, "inactive principal resolved as unprovisioned");
                Ok(PrincipalContext::unprovisioned())
            }
            None => {
                debug!(subject, "no principal profile for subject");
                Ok(PrincipalContext::unprovisioned())
            }
        }
    }

    /// Resolves the context of an internal principal id.
    pub async fn resolve_context_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<PrincipalContext> {
        match self.principal_repository.find_principal(principal_id).await? {
            Some(principal) if principal.is_active => self.context_for(&principal).await,
            _ => Ok(PrincipalContext::unprovisioned()),
        }
    }

    /// Drops cached contexts; every principal when `None`.
    pub async fn invalidate_context(&self, principal_id: Option<PrincipalId>) -> AppResult<()> {
        let Some(context_cache) = &self.context_cache else {
            return Ok(());
        };

        context_cache.invalidate_context(principal_id).await
    }

    /// Builds the "what can I do" summary of a context.
    #[must_use]
    pub fn data_access_summary(&self, context: &PrincipalContext) -> DataAccessSummary {
        let mut modules: Vec<ModuleAccessSummary> = Vec::new();
        for (key, scope) in context.permission_scopes() {
            match modules.last_mut() {
                Some(module) if module.module == key.resource() => {
                    module.permissions.push((key.action(), *scope));
                }
                _ => modules.push(ModuleAccessSummary {
                    module: key.resource().to_owned(),
                    permissions: vec![(key.action(), *scope)],
                }),
            }
        }

        DataAccessSummary {
            principal_id: context.principal_id(),
            is_superadmin: context.is_superadmin(),
            effective_scope: context.effective_scope(),
            position_ids: context.position_ids().iter().copied().collect(),
            department_ids: context.department_ids().iter().copied().collect(),
            school_ids: context.school_ids().iter().copied().collect(),
            modules,
        }
    }

    async fn context_for(&self, principal: &Principal) -> AppResult<PrincipalContext> {
        let principal_id = principal.principal_id;

        if let Some(context_cache) = &self.context_cache {
            match context_cache.get_context(principal_id).await {
                Ok(Some(context)) => return Ok(context),
                Ok(None) => {}
                Err(error) => warn!(%principal_id, %error, "principal context cache read failed"),
            }
        }

        let context = self.build_context(principal).await?;

        if let Some(context_cache) = &self.context_cache
            && let Err(error) = context_cache
                .set_context(principal_id, &context, self.context_cache_ttl_seconds)
                .await
        {
            warn!(%principal_id, %error, "principal context cache write failed");
        }

        Ok(context)
    }

    /// Builds a fresh context from storage, bypassing the context cache.
    pub async fn build_context(&self, principal: &Principal) -> AppResult<PrincipalContext> {
        let principal_id = principal.principal_id;
        let assignments = self
            .principal_repository
            .list_active_position_assignments(principal_id)
            .await?;

        let effective_scope = calculate_scope(principal.is_superadmin, &assignments);
        let memberships = collect_memberships(&assignments);
        let position_ids: Vec<PositionId> = memberships.position_ids.iter().copied().collect();

        let mut permission_scopes = BTreeMap::new();

        let module_access = if position_ids.is_empty() {
            Vec::new()
        } else {
            self.principal_repository
                .list_module_access_for_positions(&position_ids)
                .await?
        };
        for entry in module_access {
            merge_permission_scope(
                &mut permission_scopes,
                entry.key,
                entry.scope.unwrap_or(effective_scope),
            );
        }

        for (key, scope) in self.role_permission_scopes(principal_id).await? {
            merge_permission_scope(
                &mut permission_scopes,
                key,
                scope.unwrap_or(effective_scope),
            );
        }

        debug!(
            %principal_id,
            effective_scope = effective_scope.as_str(),
            positions = memberships.position_ids.len(),
            permission_scopes = permission_scopes.len(),
            "principal context built"
        );

        Ok(PrincipalContext::new(
            principal_id,
            principal.is_superadmin,
            effective_scope,
            memberships,
            permission_scopes,
        ))
    }

    /// Granted rules of effective roles and of ancestors reached over inheriting edges.
    async fn role_permission_scopes(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<(PermissionKey, Option<AccessScope>)>> {
        let now = Utc::now();
        let role_ids: Vec<RoleId> = self
            .permission_repository
            .list_user_roles(principal_id)
            .await?
            .into_iter()
            .filter(|role| role.is_effective_at(now))
            .map(|role| role.role_id)
            .collect();

        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let walk = walk_ancestors(
            self.permission_repository.as_ref(),
            &role_ids,
            EdgeFilter::Inheriting,
            self.max_hierarchy_depth,
        )
        .await?;
        let reachable: Vec<RoleId> = walk.roles().collect();

        Ok(self
            .permission_repository
            .list_granted_role_permissions(&reachable)
            .await?
            .into_iter()
            .filter(|rule| rule.is_granted)
            .map(|rule| (rule.key, rule.scope))
            .collect())
    }
}

fn collect_memberships(assignments: &[PositionAssignment]) -> OrganizationMemberships {
    let mut position_ids = BTreeSet::new();
    let mut department_ids = BTreeSet::new();
    let mut school_ids = BTreeSet::new();

    for assignment in assignments.iter().filter(|assignment| assignment.is_active) {
        position_ids.insert(assignment.position.position_id);
        department_ids.extend(assignment.position.department_id);
        school_ids.extend(assignment.position.school_ids());
    }

    OrganizationMemberships {
        position_ids,
        department_ids,
        school_ids,
    }
}
