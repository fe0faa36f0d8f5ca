use std::str::FromStr;

use orgaccess_core::AppError;
use orgaccess_domain::{AccessScope, PermissionAction, PermissionKey};

/// Maps a driver error into the application taxonomy.
///
/// Connectivity failures surface as [`AppError::Unavailable`] so callers can
/// tell "could not decide" apart from a decision.
pub(crate) fn database_error(context: &str, error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => AppError::Unavailable(format!("{context}: {error}")),
        sqlx::Error::Database(database_error) if database_error.is_foreign_key_violation() => {
            AppError::Validation(format!("{context}: referenced record does not exist"))
        }
        _ => AppError::Internal(format!("{context}: {error}")),
    }
}

pub(crate) fn decode_key(resource: &str, action: &str) -> Result<PermissionKey, AppError> {
    let action = PermissionAction::from_str(action).map_err(|error| {
        AppError::Internal(format!(
            "failed to decode stored action for resource '{resource}': {error}"
        ))
    })?;

    PermissionKey::new(resource, action).map_err(|error| {
        AppError::Internal(format!("failed to decode stored resource '{resource}': {error}"))
    })
}

pub(crate) fn decode_scope(scope: Option<&str>) -> Result<Option<AccessScope>, AppError> {
    scope
        .map(|scope| {
            AccessScope::from_str(scope).map_err(|error| {
                AppError::Internal(format!("failed to decode stored scope '{scope}': {error}"))
            })
        })
        .transpose()
}
