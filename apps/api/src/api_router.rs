use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use orgaccess_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::state::AppState;
use crate::{auth, handlers, middleware};

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let access_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/api/access/me",
            get(handlers::access::data_access_summary_handler),
        )
        .route(
            "/api/access/check",
            post(handlers::access::check_permissions_handler),
        )
        .route(
            "/api/access/filter/{resource}/{action}",
            get(handlers::access::row_filter_handler),
        )
        .route(
            "/api/access/records/{entity_type}/{entity_id}/{action}",
            get(handlers::access::record_access_handler),
        );

    let admin_routes = Router::new()
        .route(
            "/api/admin/user-permissions",
            post(handlers::admin::grant_user_permission_handler),
        )
        .route(
            "/api/admin/user-permissions/revoke",
            post(handlers::admin::revoke_user_permission_handler),
        )
        .route(
            "/api/admin/role-permissions",
            put(handlers::admin::set_role_permission_handler),
        )
        .route(
            "/api/admin/role-permissions/remove",
            post(handlers::admin::remove_role_permission_handler),
        )
        .route(
            "/api/admin/role-hierarchy",
            post(handlers::admin::link_roles_handler),
        )
        .route(
            "/api/admin/role-hierarchy/remove",
            post(handlers::admin::unlink_roles_handler),
        )
        .route(
            "/api/admin/cache/invalidate",
            post(handlers::admin::invalidate_cache_handler),
        );

    let protected_routes = access_routes
        .merge(admin_routes)
        .route_layer(from_fn(middleware::require_auth));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(access_cors_layer(frontend_url)?)
        .layer(session_layer)
        .with_state(app_state))
}

/// Credentialed CORS for the frontend; the surface only reads and posts.
fn access_cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    let origin = HeaderValue::from_str(frontend_url).map_err(|error| {
        AppError::Validation(format!("invalid FRONTEND_URL '{frontend_url}': {error}"))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]))
}
