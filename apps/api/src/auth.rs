use axum::Json;
use axum::extract::Extension;
use axum::http::StatusCode;
use orgaccess_core::{AppError, ExternalIdentity};
use tower_sessions::Session;
use tracing::info;

use crate::dto::UserIdentityResponse;
use crate::error::ApiResult;

/// Session key under which the identity collaborator stores the signed-in identity.
pub const SESSION_USER_KEY: &str = "user_identity";

pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    let subject = session
        .get::<ExternalIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .map(|identity| identity.subject().to_owned());

    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    info!(subject = subject.as_deref(), "session ended");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    Extension(user): Extension<ExternalIdentity>,
) -> ApiResult<Json<UserIdentityResponse>> {
    Ok(Json(UserIdentityResponse::from(user)))
}
