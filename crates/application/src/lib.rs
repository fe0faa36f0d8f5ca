//! Application services and ports of the authorization engine.

#![forbid(unsafe_code)]

mod access_ports;
mod authorization_service;
mod permission_admin_service;
mod permission_cache;
mod principal_context_service;
mod role_graph;
mod row_access_service;

#[cfg(test)]
mod test_support;

pub use access_ports::{
    EntityAccessRepository, GrantUserPermissionInput, ModuleAccessEntry,
    PermissionAdminRepository, PermissionCacheEntry, PermissionCacheRepository,
    PermissionRepository, PrincipalContextCache, PrincipalRepository, RolePermissionInput,
};
pub use authorization_service::{
    AccessSubject, AuthorizationService, DEFAULT_MAX_ROLE_HIERARCHY_DEPTH, DecisionSource,
    PermissionDecision,
};
pub use permission_admin_service::PermissionAdminService;
pub use permission_cache::{DEFAULT_PERMISSION_CACHE_TTL_SECONDS, PermissionCache};
pub use principal_context_service::{
    DEFAULT_CONTEXT_CACHE_TTL_SECONDS, DataAccessSummary, ModuleAccessSummary,
    PrincipalContextService,
};
pub use row_access_service::RowAccessService;
