use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, NonEmptyString};

/// Signed-in identity as written to the shared session by the identity provider.
///
/// Credentials are checked upstream. The engine only maps `subject` onto an
/// internal principal, so the subject is the one field it relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    subject: String,
    display_name: String,
    email: Option<String>,
}

impl ExternalIdentity {
    /// Creates an identity from provider claims.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email,
        }
    }

    /// Checks a deserialized session identity before it is trusted.
    ///
    /// The subject is trimmed and must be non-empty. A blank display name
    /// falls back to the subject and emails are lowercased.
    pub fn validated(self) -> AppResult<Self> {
        let subject = NonEmptyString::new(self.subject.trim())
            .map_err(|_| AppError::Unauthorized("session identity has no subject".to_owned()))?;
        let subject = String::from(subject);

        let display_name = match self.display_name.trim() {
            "" => subject.clone(),
            name => name.to_owned(),
        };
        let email = self
            .email
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty());

        Ok(Self {
            subject,
            display_name,
            email,
        })
    }

    /// Stable subject claim; the lookup key for internal principals.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Name shown to people.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Email, if the provider released one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
