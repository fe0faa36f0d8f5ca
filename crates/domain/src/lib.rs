//! Domain entities and invariants of the authorization engine.

#![forbid(unsafe_code)]

mod ids;
mod organization;
mod permission;
mod principal;
mod role;
mod row_filter;
mod scope;

pub use ids::{
    AssignmentId, DepartmentId, PermissionId, PositionId, PrincipalId, RoleId, SchoolId,
};
pub use organization::{
    AccessEntityType, EntityOwnership, PositionAssignment, PositionPlacement,
};
pub use permission::{PermissionAction, PermissionDefinition, PermissionKey, PermissionRequest};
pub use principal::{
    OrganizationMemberships, Principal, PrincipalContext, merge_permission_scope,
};
pub use role::{
    Role, RoleHierarchyEdge, RolePermissionRule, UserPermissionGrant, UserRoleAssignment,
    ValidityWindow,
};
pub use row_filter::{RowAttributes, RowFilter, scope_admits_record};
pub use scope::{
    AccessScope, DEPARTMENT_LEVEL_MAX, ORGANIZATION_LEVEL_MAX, SCHOOL_LEVEL_MAX, calculate_scope,
};
