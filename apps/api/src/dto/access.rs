use orgaccess_application::{DataAccessSummary, DecisionSource, ModuleAccessSummary};
use orgaccess_core::AppResult;
use orgaccess_domain::{PermissionRequest, RowFilter};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One action granted on a module, with the scope it applies to.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/module-permission-response.ts"
)]
pub struct ModulePermissionResponse {
    pub action: String,
    pub scope: String,
}

/// Granted actions on one resource.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/module-access-response.ts"
)]
pub struct ModuleAccessResponse {
    pub module: String,
    pub permissions: Vec<ModulePermissionResponse>,
}

/// "What can I do" summary for the signed-in principal.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/data-access-summary-response.ts"
)]
pub struct DataAccessSummaryResponse {
    pub principal_id: Option<String>,
    pub is_provisioned: bool,
    pub is_superadmin: bool,
    pub effective_scope: String,
    pub position_ids: Vec<String>,
    pub department_ids: Vec<String>,
    pub school_ids: Vec<String>,
    pub modules: Vec<ModuleAccessResponse>,
}

impl From<ModuleAccessSummary> for ModuleAccessResponse {
    fn from(value: ModuleAccessSummary) -> Self {
        Self {
            module: value.module,
            permissions: value
                .permissions
                .into_iter()
                .map(|(action, scope)| ModulePermissionResponse {
                    action: action.as_str().to_owned(),
                    scope: scope.as_str().to_owned(),
                })
                .collect(),
        }
    }
}

impl From<DataAccessSummary> for DataAccessSummaryResponse {
    fn from(value: DataAccessSummary) -> Self {
        Self {
            principal_id: value.principal_id.map(|id| id.to_string()),
            is_provisioned: value.principal_id.is_some(),
            is_superadmin: value.is_superadmin,
            effective_scope: value.effective_scope.as_str().to_owned(),
            position_ids: value.position_ids.iter().map(ToString::to_string).collect(),
            department_ids: value
                .department_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
            school_ids: value.school_ids.iter().map(ToString::to_string).collect(),
            modules: value
                .modules
                .into_iter()
                .map(ModuleAccessResponse::from)
                .collect(),
        }
    }
}

/// How a batch of checks is combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/check-mode.ts"
)]
pub enum CheckMode {
    /// Granted only if every check passes; stops at the first denial.
    All,
    /// Granted if one check passes; stops at the first grant.
    Any,
    /// Every check is decided and reported.
    #[default]
    Each,
}

/// One permission question.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-check-request.ts"
)]
pub struct PermissionCheckRequest {
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
    pub resource_id: Option<String>,
}

impl PermissionCheckRequest {
    /// Parses transport values into a domain request.
    pub fn to_request(&self) -> AppResult<PermissionRequest> {
        let request = PermissionRequest::parse(
            self.resource.as_str(),
            self.action.as_str(),
            self.scope.as_deref(),
        )?;

        Ok(match &self.resource_id {
            Some(resource_id) => request.with_resource_id(resource_id.clone()),
            None => request,
        })
    }
}

/// Incoming payload for batch permission checks.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/check-permissions-request.ts"
)]
pub struct CheckPermissionsRequest {
    pub checks: Vec<PermissionCheckRequest>,
    #[serde(default)]
    #[ts(optional)]
    pub mode: Option<CheckMode>,
}

/// Decision for one check.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-decision-response.ts"
)]
pub struct PermissionDecisionResponse {
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
    pub granted: bool,
    pub source: String,
}

impl PermissionDecisionResponse {
    /// Builds a response from the request and the step that decided it.
    #[must_use]
    pub fn new(request: &PermissionRequest, granted: bool, source: DecisionSource) -> Self {
        Self {
            resource: request.key().resource().to_owned(),
            action: request.key().action().as_str().to_owned(),
            scope: request.scope().map(|scope| scope.as_str().to_owned()),
            granted,
            source: source.as_str().to_owned(),
        }
    }
}

/// Batch check outcome. `decisions` is filled only in `each` mode.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/check-permissions-response.ts"
)]
pub struct CheckPermissionsResponse {
    pub granted: bool,
    pub decisions: Vec<PermissionDecisionResponse>,
}

/// Row visibility predicate; `kind` is `school_membership`, `department_or_owner`, `owner` or `no_rows`.
#[derive(Debug, PartialEq, Eq, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/row-filter-response.ts"
)]
pub struct RowFilterResponse {
    pub kind: &'static str,
    pub school_ids: Vec<String>,
    pub department_ids: Vec<String>,
    pub owner_id: Option<String>,
}

impl From<RowFilter> for RowFilterResponse {
    fn from(value: RowFilter) -> Self {
        match value {
            RowFilter::SchoolMembership { school_ids } => Self {
                kind: "school_membership",
                school_ids: school_ids.iter().map(ToString::to_string).collect(),
                department_ids: Vec::new(),
                owner_id: None,
            },
            RowFilter::DepartmentOrOwner {
                department_ids,
                owner_id,
            } => Self {
                kind: "department_or_owner",
                school_ids: Vec::new(),
                department_ids: department_ids.iter().map(ToString::to_string).collect(),
                owner_id: Some(owner_id.to_string()),
            },
            RowFilter::Owner { owner_id } => Self {
                kind: "owner",
                school_ids: Vec::new(),
                department_ids: Vec::new(),
                owner_id: Some(owner_id.to_string()),
            },
            RowFilter::NoRows => Self {
                kind: "no_rows",
                school_ids: Vec::new(),
                department_ids: Vec::new(),
                owner_id: None,
            },
        }
    }
}

/// Record-level access decision.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/record-access-response.ts"
)]
pub struct RecordAccessResponse {
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub granted: bool,
}
