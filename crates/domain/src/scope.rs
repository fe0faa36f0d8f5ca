//! Visibility scopes and the scope calculator.
//!
//! Scopes are totally ordered `Own < Department < School < All`. Position
//! hierarchy levels map onto scopes by fixed thresholds: a level at or below
//! [`ORGANIZATION_LEVEL_MAX`] sees everything, at or below
//! [`SCHOOL_LEVEL_MAX`] sees its schools, at or below
//! [`DEPARTMENT_LEVEL_MAX`] sees its departments, and anything else only
//! sees its own rows.

use std::str::FromStr;

use orgaccess_core::AppError;
use serde::{Deserialize, Serialize};

use crate::PositionAssignment;

/// Most junior hierarchy level with organization-wide authority.
pub const ORGANIZATION_LEVEL_MAX: i32 = 1;

/// Most junior hierarchy level with school-wide authority.
pub const SCHOOL_LEVEL_MAX: i32 = 2;

/// Most junior hierarchy level with department-wide authority.
pub const DEPARTMENT_LEVEL_MAX: i32 = 4;

/// Visibility breadth granted to a principal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessScope {
    /// Only rows owned by the principal.
    #[default]
    Own,
    /// Rows of the principal's departments.
    Department,
    /// Rows of the principal's schools.
    School,
    /// Every row.
    All,
}

impl AccessScope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "OWN",
            Self::Department => "DEPARTMENT",
            Self::School => "SCHOOL",
            Self::All => "ALL",
        }
    }

    /// Returns the more permissive of two scopes.
    #[must_use]
    pub fn most_permissive(self, other: Self) -> Self {
        self.max(other)
    }
}

impl FromStr for AccessScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWN" => Ok(Self::Own),
            "DEPARTMENT" => Ok(Self::Department),
            "SCHOOL" => Ok(Self::School),
            "ALL" => Ok(Self::All),
            _ => Err(AppError::Validation(format!(
                "unknown access scope '{value}'"
            ))),
        }
    }
}

/// Derives the most permissive scope warranted by a principal's active positions.
///
/// Superadmins always resolve to [`AccessScope::All`]. Inactive assignments
/// are ignored; a principal without active assignments resolves to
/// [`AccessScope::Own`].
#[must_use]
pub fn calculate_scope(is_superadmin: bool, assignments: &[PositionAssignment]) -> AccessScope {
    if is_superadmin {
        return AccessScope::All;
    }

    let mut highest_level: Option<i32> = None;
    let mut has_school_level = false;
    let mut has_department_level = false;

    for assignment in assignments.iter().filter(|assignment| assignment.is_active) {
        let level = assignment.position.hierarchy_level;
        highest_level = Some(highest_level.map_or(level, |current| current.min(level)));
        has_school_level |= level <= SCHOOL_LEVEL_MAX;
        has_department_level |= level <= DEPARTMENT_LEVEL_MAX;
    }

    if highest_level.is_some_and(|level| level <= ORGANIZATION_LEVEL_MAX) {
        AccessScope::All
    } else if has_school_level {
        AccessScope::School
    } else if has_department_level {
        AccessScope::Department
    } else {
        AccessScope::Own
    }
}
