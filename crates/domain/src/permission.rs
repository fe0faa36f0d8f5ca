use std::fmt::{Display, Formatter};
use std::str::FromStr;

use orgaccess_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{AccessScope, PermissionId};

/// Actions a permission can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionAction {
    /// Create new records.
    Create,
    /// Read records.
    Read,
    /// Update records.
    Update,
    /// Delete records.
    Delete,
    /// Approve pending requests.
    Approve,
    /// Assign records or grants to principals.
    Assign,
    /// Export records.
    Export,
}

impl PermissionAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Approve => "APPROVE",
            Self::Assign => "ASSIGN",
            Self::Export => "EXPORT",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionAction] = &[
            PermissionAction::Create,
            PermissionAction::Read,
            PermissionAction::Update,
            PermissionAction::Delete,
            PermissionAction::Approve,
            PermissionAction::Assign,
            PermissionAction::Export,
        ];

        ALL
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| AppError::Validation(format!("unknown permission action '{value}'")))
    }
}

/// Strongly typed `(resource, action)` pair used for scope lookup and caching.
///
/// Resource names are trimmed and lowercased so that differently formatted
/// inputs address the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey {
    resource: NonEmptyString,
    action: PermissionAction,
}

impl PermissionKey {
    /// Creates a validated key.
    pub fn new(resource: impl Into<String>, action: PermissionAction) -> AppResult<Self> {
        let resource = resource.into().trim().to_ascii_lowercase();
        if resource.contains(':') {
            return Err(AppError::Validation(format!(
                "permission resource '{resource}' must not contain ':'"
            )));
        }

        Ok(Self {
            resource: NonEmptyString::new(resource)?,
            action,
        })
    }

    /// Returns the resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> PermissionAction {
        self.action
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.resource, self.action.as_str())
    }
}

impl FromStr for PermissionKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (resource, action) = value.rsplit_once(':').ok_or_else(|| {
            AppError::Validation(format!(
                "permission key '{value}' must look like 'resource:action'"
            ))
        })?;

        Self::new(resource, PermissionAction::from_str(action)?)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.to_string()
    }
}

/// Atomic capability definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Permission identifier.
    pub permission_id: PermissionId,
    /// Resource and action.
    pub key: PermissionKey,
    /// Scope attached to the capability, when it is scoped.
    pub scope: Option<AccessScope>,
    /// Inactive permissions never match.
    pub is_active: bool,
}

/// One authorization question asked by calling code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    key: PermissionKey,
    scope: Option<AccessScope>,
    resource_id: Option<String>,
}

impl PermissionRequest {
    /// Creates an unscoped request for a key.
    #[must_use]
    pub fn new(key: PermissionKey) -> Self {
        Self {
            key,
            scope: None,
            resource_id: None,
        }
    }

    /// Parses a request from transport values.
    pub fn parse(resource: &str, action: &str, scope: Option<&str>) -> AppResult<Self> {
        let key = PermissionKey::new(resource, PermissionAction::from_str(action)?)?;
        let scope = scope.map(AccessScope::from_str).transpose()?;

        Ok(Self::new(key).with_optional_scope(scope))
    }

    /// Restricts the request to permissions carrying the given scope.
    #[must_use]
    pub fn with_scope(self, scope: AccessScope) -> Self {
        self.with_optional_scope(Some(scope))
    }

    /// Sets or clears the requested scope.
    #[must_use]
    pub fn with_optional_scope(mut self, scope: Option<AccessScope>) -> Self {
        self.scope = scope;
        self
    }

    /// Attaches the identifier of the resource being acted on.
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Returns the requested key.
    #[must_use]
    pub fn key(&self) -> &PermissionKey {
        &self.key
    }

    /// Returns the requested scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<AccessScope> {
        self.scope
    }

    /// Returns the targeted resource identifier, if any.
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }
}
