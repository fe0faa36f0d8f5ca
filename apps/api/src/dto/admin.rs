use std::str::FromStr;

use chrono::{DateTime, Utc};
use orgaccess_application::{GrantUserPermissionInput, RolePermissionInput};
use orgaccess_core::{AppError, AppResult};
use orgaccess_domain::{
    AccessScope, PermissionAction, PermissionKey, PrincipalId, RoleId, ValidityWindow,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for a direct grant or deny.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/grant-user-permission-request.ts"
)]
pub struct GrantUserPermissionRequest {
    pub principal_id: String,
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
    /// Defaults to `true`; `false` records an explicit deny.
    pub is_granted: Option<bool>,
    pub priority: Option<i32>,
    /// RFC 3339 timestamp; defaults to now.
    pub valid_from: Option<String>,
    /// RFC 3339 timestamp; unbounded when absent.
    pub valid_until: Option<String>,
    pub is_temporary: Option<bool>,
    pub grant_reason: Option<String>,
}

impl GrantUserPermissionRequest {
    /// Converts the payload into a service input stamped at `now`.
    pub fn into_input(self, now: DateTime<Utc>) -> AppResult<GrantUserPermissionInput> {
        let valid_from = self
            .valid_from
            .as_deref()
            .map(|value| parse_timestamp("valid_from", value))
            .transpose()?
            .unwrap_or(now);
        let valid_until = self
            .valid_until
            .as_deref()
            .map(|value| parse_timestamp("valid_until", value))
            .transpose()?;

        Ok(GrantUserPermissionInput {
            principal_id: PrincipalId::from_str(self.principal_id.as_str())?,
            key: parse_key(self.resource.as_str(), self.action.as_str())?,
            scope: parse_scope(self.scope.as_deref())?,
            is_granted: self.is_granted.unwrap_or(true),
            priority: self.priority.unwrap_or(0),
            validity: ValidityWindow {
                valid_from,
                valid_until,
            },
            is_temporary: self.is_temporary.unwrap_or(false),
            granted_by: None,
            grant_reason: self.grant_reason,
        })
    }
}

/// Incoming payload for removing a direct rule.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/revoke-user-permission-request.ts"
)]
pub struct RevokeUserPermissionRequest {
    pub principal_id: String,
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
}

/// Incoming payload for a role grant or deny.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-permission-request.ts"
)]
pub struct RolePermissionRequest {
    pub role_id: String,
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
    /// Defaults to `true`; `false` records an explicit deny.
    pub is_granted: Option<bool>,
}

impl TryFrom<RolePermissionRequest> for RolePermissionInput {
    type Error = AppError;

    fn try_from(value: RolePermissionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            role_id: RoleId::from_str(value.role_id.as_str())?,
            key: parse_key(value.resource.as_str(), value.action.as_str())?,
            scope: parse_scope(value.scope.as_deref())?,
            is_granted: value.is_granted.unwrap_or(true),
        })
    }
}

/// Incoming payload for removing a role rule.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/remove-role-permission-request.ts"
)]
pub struct RemoveRolePermissionRequest {
    pub role_id: String,
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
}

/// Incoming payload for linking a child role under a parent.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-hierarchy-request.ts"
)]
pub struct RoleHierarchyRequest {
    pub child_role_id: String,
    pub parent_role_id: String,
    /// Defaults to `true`.
    pub inherit_permissions: Option<bool>,
}

/// Incoming payload for removing a hierarchy edge.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/unlink-roles-request.ts"
)]
pub struct UnlinkRolesRequest {
    pub child_role_id: String,
    pub parent_role_id: String,
}

/// Incoming payload for administrative cache invalidation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/invalidate-cache-request.ts"
)]
pub struct InvalidateCacheRequest {
    /// Every principal when absent.
    pub principal_id: Option<String>,
}

/// Number of cached decisions invalidated.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/invalidate-cache-response.ts"
)]
pub struct InvalidateCacheResponse {
    #[ts(type = "number")]
    pub invalidated: u64,
}

fn parse_key(resource: &str, action: &str) -> AppResult<PermissionKey> {
    PermissionKey::new(resource, PermissionAction::from_str(action)?)
}

fn parse_scope(scope: Option<&str>) -> AppResult<Option<AccessScope>> {
    scope.map(AccessScope::from_str).transpose()
}

fn parse_timestamp(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| AppError::Validation(format!("invalid {field} '{value}': {error}")))
}
