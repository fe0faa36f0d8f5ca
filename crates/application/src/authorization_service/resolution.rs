use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use orgaccess_core::AppResult;
use orgaccess_domain::{AccessScope, PermissionKey, RoleId, RolePermissionRule};
use tracing::debug;

use super::*;
use crate::role_graph::{EdgeFilter, walk_ancestors};

impl AuthorizationService {
    pub(super) async fn evaluate(
        &self,
        principal_id: PrincipalId,
        subject: AccessSubject<'_>,
        request: &PermissionRequest,
    ) -> AppResult<PermissionDecision> {
        let now = Utc::now();

        let Some(is_superadmin) = self.subject_superadmin_flag(principal_id, subject).await? else {
            debug!(%principal_id, "missing or inactive principal denied");
            return Ok(PermissionDecision::new(false, DecisionSource::DefaultDeny));
        };

        if let Some(granted) = self.direct_rule(principal_id, request, now).await? {
            return Ok(PermissionDecision::new(granted, DecisionSource::DirectRule));
        }

        if let Some(decision) = self.role_rule(principal_id, request, now).await? {
            return Ok(decision);
        }

        if is_superadmin {
            return Ok(PermissionDecision::new(true, DecisionSource::Superadmin));
        }

        Ok(PermissionDecision::new(false, DecisionSource::DefaultDeny))
    }

    /// Highest-priority effective direct rule; denies win priority ties.
    async fn direct_rule(
        &self,
        principal_id: PrincipalId,
        request: &PermissionRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Option<bool>> {
        let mut candidates: Vec<_> = self
            .permission_repository
            .list_direct_permissions(principal_id, request.key(), request.scope())
            .await?
            .into_iter()
            .filter(|grant| {
                grant.is_effective_at(now)
                    && matches_request(&grant.key, grant.scope, request.key(), request.scope())
            })
            .collect();

        candidates.sort_by_key(|grant| (Reverse(grant.priority), grant.is_granted));

        Ok(candidates.first().map(|grant| grant.is_granted))
    }

    /// First role, in repository order, that yields a decision wins.
    ///
    /// A role's own rules are consulted before its ancestors; a deny found on
    /// one role ends the search even if a later role would allow.
    async fn role_rule(
        &self,
        principal_id: PrincipalId,
        request: &PermissionRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PermissionDecision>> {
        let roles = self
            .permission_repository
            .list_user_roles(principal_id)
            .await?;

        for role in roles.iter().filter(|role| role.is_effective_at(now)) {
            let rules = self.matching_role_rules(role.role_id, request).await?;

            if rules.iter().any(|rule| rule.is_granted) {
                return Ok(Some(PermissionDecision::new(true, DecisionSource::RoleRule)));
            }
            if !rules.is_empty() {
                return Ok(Some(PermissionDecision::new(false, DecisionSource::RoleRule)));
            }

            if self.inherits_grant(role.role_id, request).await? {
                return Ok(Some(PermissionDecision::new(
                    true,
                    DecisionSource::InheritedRoleGrant,
                )));
            }
        }

        Ok(None)
    }

    /// Looks for a grant on any ancestor reachable over inheriting edges.
    ///
    /// Only grants propagate; parent denies are ignored.
    async fn inherits_grant(&self, role_id: RoleId, request: &PermissionRequest) -> AppResult<bool> {
        let ancestors = walk_ancestors(
            self.permission_repository.as_ref(),
            &[role_id],
            EdgeFilter::Inheriting,
            self.max_hierarchy_depth,
        )
        .await?;

        for ancestor in ancestors.roles().filter(|ancestor| *ancestor != role_id) {
            let rules = self.matching_role_rules(ancestor, request).await?;
            if rules.iter().any(|rule| rule.is_granted) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn matching_role_rules(
        &self,
        role_id: RoleId,
        request: &PermissionRequest,
    ) -> AppResult<Vec<RolePermissionRule>> {
        Ok(self
            .permission_repository
            .list_role_permission_rules(role_id, request.key(), request.scope())
            .await?
            .into_iter()
            .filter(|rule| matches_request(&rule.key, rule.scope, request.key(), request.scope()))
            .collect())
    }

    /// Superadmin flag of an evaluable subject; `None` for a missing or
    /// inactive principal.
    async fn subject_superadmin_flag(
        &self,
        principal_id: PrincipalId,
        subject: AccessSubject<'_>,
    ) -> AppResult<Option<bool>> {
        match subject {
            AccessSubject::Context(context) => Ok(Some(context.is_superadmin())),
            AccessSubject::Principal(_) => Ok(self
                .principal_repository
                .find_principal(principal_id)
                .await?
                .filter(|principal| principal.is_active)
                .map(|principal| principal.is_superadmin)),
        }
    }
}

fn matches_request(
    key: &PermissionKey,
    scope: Option<AccessScope>,
    requested_key: &PermissionKey,
    requested_scope: Option<AccessScope>,
) -> bool {
    key == requested_key && requested_scope.is_none_or(|requested| scope == Some(requested))
}
