use orgaccess_core::ExternalIdentity;
use serde::Serialize;
use ts_rs::TS;

/// Health response payload; `ready` drives the HTTP status.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// One runtime dependency health status.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    /// `ok`, `error` or `disabled`.
    pub status: &'static str,
    pub detail: Option<String>,
}

impl HealthDependencyStatus {
    /// Status of a dependency that is not configured.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            status: "disabled",
            detail: None,
        }
    }

    /// Status from a probe outcome; the error text becomes the detail.
    #[must_use]
    pub fn from_probe(probe: Result<(), String>) -> Self {
        match probe {
            Ok(()) => Self {
                status: "ok",
                detail: None,
            },
            Err(detail) => Self {
                status: "error",
                detail: Some(detail),
            },
        }
    }
}

/// Identity the session was opened for.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/user-identity-response.ts"
)]
pub struct UserIdentityResponse {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl From<ExternalIdentity> for UserIdentityResponse {
    fn from(identity: ExternalIdentity) -> Self {
        Self {
            subject: identity.subject().to_owned(),
            display_name: identity.display_name().to_owned(),
            email: identity.email().map(ToOwned::to_owned),
        }
    }
}
