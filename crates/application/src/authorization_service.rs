use std::sync::Arc;

use orgaccess_core::{AppError, AppResult};
use orgaccess_domain::{PermissionRequest, PrincipalContext, PrincipalId};
use tracing::{debug, warn};

use crate::{PermissionCache, PermissionRepository, PrincipalRepository};

mod resolution;


/// Default bound on role-hierarchy walks.
pub const DEFAULT_MAX_ROLE_HIERARCHY_DEPTH: usize = 16;

/// Step of the precedence chain that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// A valid cached decision.
    Cache,
    /// A direct principal grant or deny.
    DirectRule,
    /// A rule attached to one of the principal's roles.
    RoleRule,
    /// A grant inherited through the role hierarchy.
    InheritedRoleGrant,
    /// Superadmin fallback.
    Superadmin,
    /// Nothing matched.
    DefaultDeny,
}

impl DecisionSource {
    /// Returns a stable identifier for logs and transport.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::DirectRule => "direct_rule",
            Self::RoleRule => "role_rule",
            Self::InheritedRoleGrant => "inherited_role_grant",
            Self::Superadmin => "superadmin",
            Self::DefaultDeny => "default_deny",
        }
    }
}

/// Allow/deny outcome of one permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDecision {
    /// Whether the request is allowed.
    pub granted: bool,
    /// Step that decided.
    pub source: DecisionSource,
}

impl PermissionDecision {
    fn new(granted: bool, source: DecisionSource) -> Self {
        Self { granted, source }
    }
}

/// Principal a permission check is evaluated for.
#[derive(Debug, Clone, Copy)]
pub enum AccessSubject<'a> {
    /// Bare principal id; the superadmin flag is loaded on demand.
    Principal(PrincipalId),
    /// Resolved context carrying the superadmin flag.
    Context(&'a PrincipalContext),
}

impl AccessSubject<'_> {
    fn principal_id(&self) -> Option<PrincipalId> {
        match self {
            Self::Principal(principal_id) => Some(*principal_id),
            Self::Context(context) => context.principal_id(),
        }
    }
}

impl From<PrincipalId> for AccessSubject<'_> {
    fn from(value: PrincipalId) -> Self {
        Self::Principal(value)
    }
}

impl<'a> From<&'a PrincipalContext> for AccessSubject<'a> {
    fn from(value: &'a PrincipalContext) -> Self {
        Self::Context(value)
    }
}

/// Resolves allow/deny decisions through cache, direct grants, roles and superadmin fallback.
#[derive(Clone)]
pub struct AuthorizationService {
    principal_repository: Arc<dyn PrincipalRepository>,
    permission_repository: Arc<dyn PermissionRepository>,
    cache: PermissionCache,
    max_hierarchy_depth: usize,
}

impl AuthorizationService {
    /// Creates a new authorization service from its collaborators.
    #[must_use]
    pub fn new(
        principal_repository: Arc<dyn PrincipalRepository>,
        permission_repository: Arc<dyn PermissionRepository>,
        cache: PermissionCache,
    ) -> Self {
        Self {
            principal_repository,
            permission_repository,
            cache,
            max_hierarchy_depth: DEFAULT_MAX_ROLE_HIERARCHY_DEPTH,
        }
    }

    /// Overrides the role-hierarchy walk bound.
    #[must_use]
    pub fn with_max_hierarchy_depth(mut self, max_hierarchy_depth: usize) -> Self {
        self.max_hierarchy_depth = max_hierarchy_depth;
        self
    }

    /// Returns the decision cache.
    #[must_use]
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Resolves a request into a decision.
    ///
    /// "No rule matched" is a normal denied decision; `Err` is reserved for
    /// storage failures so callers can tell the two apart.
    pub async fn resolve<'a>(
        &self,
        subject: impl Into<AccessSubject<'a>>,
        request: &PermissionRequest,
    ) -> AppResult<PermissionDecision> {
        let subject = subject.into();
        let Some(principal_id) = subject.principal_id() else {
            debug!(key = %request.key(), "unprovisioned principal denied");
            return Ok(PermissionDecision::new(false, DecisionSource::DefaultDeny));
        };

        if let Some(granted) = self.cache.lookup(principal_id, request).await {
            return Ok(PermissionDecision::new(granted, DecisionSource::Cache));
        }

        let decision = self.evaluate(principal_id, subject, request).await?;
        self.cache
            .store(principal_id, request, decision.granted)
            .await;

        debug!(
            %principal_id,
            key = %request.key(),
            scope = request.scope().map(|scope| scope.as_str()),
            resource_id = request.resource_id(),
            granted = decision.granted,
            source = decision.source.as_str(),
            "permission resolved"
        );

        Ok(decision)
    }

    /// Returns whether the subject holds the permission.
    pub async fn has_permission<'a>(
        &self,
        subject: impl Into<AccessSubject<'a>>,
        request: &PermissionRequest,
    ) -> AppResult<bool> {
        Ok(self.resolve(subject, request).await?.granted)
    }

    /// Fail-closed variant of [`Self::has_permission`] for layers that cannot propagate errors.
    pub async fn is_allowed<'a>(
        &self,
        subject: impl Into<AccessSubject<'a>>,
        request: &PermissionRequest,
    ) -> bool {
        match self.resolve(subject, request).await {
            Ok(decision) => decision.granted,
            Err(error) => {
                warn!(key = %request.key(), %error, "permission check failed, denying");
                false
            }
        }
    }

    /// Ensures the subject holds the permission.
    pub async fn require_permission<'a>(
        &self,
        subject: impl Into<AccessSubject<'a>>,
        request: &PermissionRequest,
    ) -> AppResult<()> {
        let subject = subject.into();
        if self.has_permission(subject, request).await? {
            return Ok(());
        }

        let principal = subject
            .principal_id()
            .map_or_else(|| "unprovisioned".to_owned(), |id| id.to_string());
        Err(AppError::Forbidden(format!(
            "principal '{principal}' is missing permission '{}'",
            request.key()
        )))
    }

    /// Returns true only if every request is allowed; stops at the first denial.
    pub async fn has_permissions<'a>(
        &self,
        subject: impl Into<AccessSubject<'a>>,
        requests: &[PermissionRequest],
    ) -> AppResult<bool> {
        let subject = subject.into();
        for request in requests {
            if !self.has_permission(subject, request).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns true if any request is allowed; stops at the first grant.
    pub async fn has_any_permission<'a>(
        &self,
        subject: impl Into<AccessSubject<'a>>,
        requests: &[PermissionRequest],
    ) -> AppResult<bool> {
        let subject = subject.into();
        for request in requests {
            if self.has_permission(subject, request).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
