//! Organizational access control API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use orgaccess_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let pool = api_services::connect_and_migrate(&config).await?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_layer = api_services::build_session_layer(pool.clone(), &config).await?;
    let app_state = api_services::build_app_state(pool, &config)?;

    info!(
        permission_cache_store = ?config.permission_cache_store,
        permission_cache_ttl_seconds = config.permission_cache_ttl_seconds,
        context_cache_ttl_seconds = config.context_cache_ttl_seconds,
        context_cache_backend = if app_state.redis_client.is_some() { "redis" } else { "memory" },
        role_hierarchy_max_depth = config.role_hierarchy_max_depth,
        "authorization services configured"
    );

    let app = api_router::build_router(app_state, &config.frontend_url, session_layer)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "orgaccess-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
