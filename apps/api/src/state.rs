use orgaccess_application::{
    AuthorizationService, PermissionAdminService, PrincipalContextService, RowAccessService,
};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub principal_context_service: PrincipalContextService,
    pub authorization_service: AuthorizationService,
    pub row_access_service: RowAccessService,
    pub permission_admin_service: PermissionAdminService,
    pub postgres_pool: PgPool,
    pub redis_client: Option<redis::Client>,
    pub frontend_url: String,
}
