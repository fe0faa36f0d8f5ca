mod access;
mod admin;
mod common;

pub use access::{
    CheckMode, CheckPermissionsRequest, CheckPermissionsResponse, DataAccessSummaryResponse,
    ModuleAccessResponse, PermissionCheckRequest, PermissionDecisionResponse,
    RecordAccessResponse, RowFilterResponse,
};
pub use admin::{
    GrantUserPermissionRequest, InvalidateCacheRequest, InvalidateCacheResponse,
    RemoveRolePermissionRequest, RevokeUserPermissionRequest, RoleHierarchyRequest,
    RolePermissionRequest, UnlinkRolesRequest,
};
pub use common::{HealthDependencyStatus, HealthResponse, UserIdentityResponse};
