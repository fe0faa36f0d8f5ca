use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use chrono::Utc;
use orgaccess_application::RolePermissionInput;
use orgaccess_core::ExternalIdentity;
use orgaccess_domain::{PermissionRequest, PrincipalId, RoleId};

use crate::dto::{
    GrantUserPermissionRequest, InvalidateCacheRequest, InvalidateCacheResponse,
    RemoveRolePermissionRequest, RevokeUserPermissionRequest, RoleHierarchyRequest,
    RolePermissionRequest, UnlinkRolesRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::caller_context;

pub async fn grant_user_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<GrantUserPermissionRequest>,
) -> ApiResult<StatusCode> {
    let input = payload.into_input(Utc::now())?;
    let actor = caller_context(&state, &user).await?;

    state
        .permission_admin_service
        .grant_user_permission(&actor, input)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_user_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<RevokeUserPermissionRequest>,
) -> ApiResult<StatusCode> {
    let principal_id = PrincipalId::from_str(payload.principal_id.as_str())?;
    let target = PermissionRequest::parse(
        payload.resource.as_str(),
        payload.action.as_str(),
        payload.scope.as_deref(),
    )?;
    let actor = caller_context(&state, &user).await?;

    state
        .permission_admin_service
        .revoke_user_permission(&actor, principal_id, target.key(), target.scope())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_role_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<RolePermissionRequest>,
) -> ApiResult<StatusCode> {
    let input = RolePermissionInput::try_from(payload)?;
    let actor = caller_context(&state, &user).await?;

    state
        .permission_admin_service
        .set_role_permission(&actor, input)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_role_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<RemoveRolePermissionRequest>,
) -> ApiResult<StatusCode> {
    let role_id = RoleId::from_str(payload.role_id.as_str())?;
    let target = PermissionRequest::parse(
        payload.resource.as_str(),
        payload.action.as_str(),
        payload.scope.as_deref(),
    )?;
    let actor = caller_context(&state, &user).await?;

    state
        .permission_admin_service
        .remove_role_permission(&actor, role_id, target.key(), target.scope())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn link_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<RoleHierarchyRequest>,
) -> ApiResult<StatusCode> {
    let child_role_id = RoleId::from_str(payload.child_role_id.as_str())?;
    let parent_role_id = RoleId::from_str(payload.parent_role_id.as_str())?;
    let actor = caller_context(&state, &user).await?;

    state
        .permission_admin_service
        .link_roles(
            &actor,
            child_role_id,
            parent_role_id,
            payload.inherit_permissions.unwrap_or(true),
        )
        .await?;

    Ok(StatusCode::CREATED)
}

pub async fn unlink_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<UnlinkRolesRequest>,
) -> ApiResult<StatusCode> {
    let child_role_id = RoleId::from_str(payload.child_role_id.as_str())?;
    let parent_role_id = RoleId::from_str(payload.parent_role_id.as_str())?;
    let actor = caller_context(&state, &user).await?;

    state
        .permission_admin_service
        .unlink_roles(&actor, child_role_id, parent_role_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn invalidate_cache_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<InvalidateCacheRequest>,
) -> ApiResult<Json<InvalidateCacheResponse>> {
    let principal_id = payload
        .principal_id
        .as_deref()
        .map(PrincipalId::from_str)
        .transpose()?;
    let actor = caller_context(&state, &user).await?;

    let invalidated = state
        .permission_admin_service
        .invalidate_cache(&actor, principal_id)
        .await?;

    Ok(Json(InvalidateCacheResponse { invalidated }))
}
