use std::str::FromStr;

use chrono::NaiveDate;
use orgaccess_core::AppError;
use serde::{Deserialize, Serialize};

use crate::{AssignmentId, DepartmentId, PositionId, PrincipalId, SchoolId};

/// Position placement within the organization chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPlacement {
    /// Position identifier.
    pub position_id: PositionId,
    /// Seniority level; lower values are more senior.
    pub hierarchy_level: i32,
    /// Owning department, when the position belongs to one.
    pub department_id: Option<DepartmentId>,
    /// Owning school, when the position belongs to one directly.
    pub school_id: Option<SchoolId>,
    /// School of the owning department.
    pub department_school_id: Option<SchoolId>,
}

impl PositionPlacement {
    /// Returns every school the position is attached to, directly or through its department.
    pub fn school_ids(&self) -> impl Iterator<Item = SchoolId> + '_ {
        self.school_id.into_iter().chain(self.department_school_id)
    }
}

/// Time-boxed link between a principal and a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAssignment {
    /// Assignment identifier.
    pub assignment_id: AssignmentId,
    /// Principal occupying the position.
    pub principal_id: PrincipalId,
    /// Position and its organizational placement.
    pub position: PositionPlacement,
    /// Administrative activity flag.
    pub is_active: bool,
    /// Acting or interim holder.
    pub is_plt: bool,
    /// First day of the assignment.
    pub start_date: NaiveDate,
    /// Last day of the assignment, when bounded.
    pub end_date: Option<NaiveDate>,
}

/// Entity types supported by record-level access checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessEntityType {
    /// Organization chart position.
    Position,
    /// Department.
    Department,
    /// School.
    School,
    /// Principal-to-position assignment.
    PositionAssignment,
}

impl AccessEntityType {
    /// Returns the stable transport value, also used as the permission resource name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Department => "department",
            Self::School => "school",
            Self::PositionAssignment => "position_assignment",
        }
    }
}

impl FromStr for AccessEntityType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "position" => Ok(Self::Position),
            "department" => Ok(Self::Department),
            "school" => Ok(Self::School),
            "position_assignment" => Ok(Self::PositionAssignment),
            _ => Err(AppError::Validation(format!(
                "unsupported entity type '{value}'"
            ))),
        }
    }
}

/// Ownership projection of a single record used for record-level checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOwnership {
    /// Principal owning the record.
    pub owner_id: Option<PrincipalId>,
    /// Department the record belongs to.
    pub department_id: Option<DepartmentId>,
    /// School the record names directly.
    pub school_id: Option<SchoolId>,
    /// School of the record's department.
    pub department_school_id: Option<SchoolId>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::AccessEntityType;

    #[test]
    fn entity_type_accepts_kebab_case() {
        assert_eq!(
            AccessEntityType::from_str("position-assignment").ok(),
            Some(AccessEntityType::PositionAssignment)
        );
    }

    #[test]
    fn unknown_entity_type_is_rejected() {
        assert!(AccessEntityType::from_str("payroll").is_err());
    }
}
