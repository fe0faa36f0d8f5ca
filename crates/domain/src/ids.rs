use std::fmt::{Display, Formatter};
use std::str::FromStr;

use orgaccess_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    AppError::Validation(format!(
                        "invalid {} '{value}': {error}",
                        $label
                    ))
                })
            }
        }
    };
}

uuid_identifier!(
    /// Internal profile identifier of a principal.
    PrincipalId,
    "principal id"
);
uuid_identifier!(
    /// Identifier of a position in the organization chart.
    PositionId,
    "position id"
);
uuid_identifier!(
    /// Identifier of a department.
    DepartmentId,
    "department id"
);
uuid_identifier!(
    /// Identifier of a school.
    SchoolId,
    "school id"
);
uuid_identifier!(
    /// Identifier of a principal-to-position assignment.
    AssignmentId,
    "assignment id"
);
uuid_identifier!(
    /// Identifier of a role.
    RoleId,
    "role id"
);
uuid_identifier!(
    /// Identifier of a permission definition.
    PermissionId,
    "permission id"
);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::PrincipalId;

    #[test]
    fn identifier_parses_display_output() {
        let principal_id = PrincipalId::new();
        let parsed = PrincipalId::from_str(principal_id.to_string().as_str());
        assert_eq!(parsed.ok(), Some(principal_id));
    }

    #[test]
    fn identifier_rejects_garbage() {
        assert!(PrincipalId::from_str("not-a-uuid").is_err());
    }
}
