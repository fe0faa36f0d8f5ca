use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use orgaccess_core::{AppError, ExternalIdentity};
use orgaccess_domain::{PermissionAction, PermissionRequest};

use crate::dto::{
    CheckMode, CheckPermissionsRequest, CheckPermissionsResponse, DataAccessSummaryResponse,
    PermissionDecisionResponse, RecordAccessResponse, RowFilterResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::caller_context;

pub async fn data_access_summary_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
) -> ApiResult<Json<DataAccessSummaryResponse>> {
    let context = caller_context(&state, &user).await?;
    let summary = state
        .principal_context_service
        .data_access_summary(&context);

    Ok(Json(DataAccessSummaryResponse::from(summary)))
}

pub async fn check_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Json(payload): Json<CheckPermissionsRequest>,
) -> ApiResult<Json<CheckPermissionsResponse>> {
    if payload.checks.is_empty() {
        return Err(AppError::Validation("at least one check is required".to_owned()).into());
    }

    let requests = payload
        .checks
        .iter()
        .map(|check| check.to_request())
        .collect::<Result<Vec<_>, _>>()?;
    let context = caller_context(&state, &user).await?;
    let authorization = &state.authorization_service;

    let response = match payload.mode.unwrap_or_default() {
        CheckMode::All => CheckPermissionsResponse {
            granted: authorization.has_permissions(&context, &requests).await?,
            decisions: Vec::new(),
        },
        CheckMode::Any => CheckPermissionsResponse {
            granted: authorization.has_any_permission(&context, &requests).await?,
            decisions: Vec::new(),
        },
        CheckMode::Each => {
            let mut decisions = Vec::with_capacity(requests.len());
            for request in &requests {
                let decision = authorization.resolve(&context, request).await?;
                decisions.push(PermissionDecisionResponse::new(
                    request,
                    decision.granted,
                    decision.source,
                ));
            }

            CheckPermissionsResponse {
                granted: decisions.iter().all(|decision| decision.granted),
                decisions,
            }
        }
    };

    Ok(Json(response))
}

pub async fn row_filter_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Path((resource, action)): Path<(String, String)>,
) -> ApiResult<Json<Option<RowFilterResponse>>> {
    let request = PermissionRequest::parse(resource.as_str(), action.as_str(), None)?;
    let context = caller_context(&state, &user).await?;

    Ok(Json(
        state
            .row_access_service
            .build_filter(&context, request.key())
            .map(RowFilterResponse::from),
    ))
}

pub async fn record_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<ExternalIdentity>,
    Path((entity_type, entity_id, action)): Path<(String, String, String)>,
) -> ApiResult<Json<RecordAccessResponse>> {
    let action = PermissionAction::from_str(action.as_str())?;
    let context = caller_context(&state, &user).await?;
    let granted = state
        .row_access_service
        .can_access(&context, entity_type.as_str(), entity_id.as_str(), action)
        .await?;

    Ok(Json(RecordAccessResponse {
        entity_type,
        entity_id,
        action: action.as_str().to_owned(),
        granted,
    }))
}
