pub mod access;
pub mod admin;
pub mod health;

use orgaccess_core::ExternalIdentity;
use orgaccess_domain::PrincipalContext;

use crate::error::ApiResult;
use crate::state::AppState;

/// Resolves the context of the signed-in identity for one request.
async fn caller_context(state: &AppState, user: &ExternalIdentity) -> ApiResult<PrincipalContext> {
    Ok(state
        .principal_context_service
        .resolve_context(user)
        .await?)
}
