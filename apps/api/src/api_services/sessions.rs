use orgaccess_core::AppError;
use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::api_config::ApiConfig;

/// Table shared with the identity collaborator that signs users in.
const SESSION_TABLE: &str = "tower_sessions";

pub async fn build_session_layer(
    pool: PgPool,
    config: &ApiConfig,
) -> Result<SessionManagerLayer<PostgresStore>, AppError> {
    let session_store = PostgresStore::new(pool)
        .with_table_name(SESSION_TABLE)
        .map_err(|error| AppError::Validation(format!("invalid session table '{SESSION_TABLE}': {error}")))?;

    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to prepare session table '{SESSION_TABLE}': {error}"))
    })?;

    let idle_minutes = i64::from(config.session_idle_timeout_minutes);

    Ok(SessionManagerLayer::new(session_store)
        .with_secure(config.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(idle_minutes))))
}
