//! Declarative row-level visibility filters.
//!
//! A [`RowFilter`] describes which rows a principal may see. Query-issuing
//! collaborators translate it into their own predicate language; `None`
//! everywhere in this module means "no restriction".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    AccessScope, DepartmentId, EntityOwnership, PermissionKey, PrincipalContext, PrincipalId,
    SchoolId,
};

/// Visibility predicate derived from a resolved scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowFilter {
    /// Rows whose school, or whose department's school, is listed.
    SchoolMembership {
        /// Visible schools.
        school_ids: BTreeSet<SchoolId>,
    },
    /// Rows of the listed departments, plus rows owned by the principal.
    DepartmentOrOwner {
        /// Visible departments.
        department_ids: BTreeSet<DepartmentId>,
        /// Principal whose own rows stay visible.
        owner_id: PrincipalId,
    },
    /// Rows owned by the principal.
    Owner {
        /// Owning principal.
        owner_id: PrincipalId,
    },
    /// No row is visible.
    NoRows,
}

/// Row columns a [`RowFilter`] inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowAttributes {
    /// Owning principal.
    pub owner_id: Option<PrincipalId>,
    /// Department of the row.
    pub department_id: Option<DepartmentId>,
    /// School of the row.
    pub school_id: Option<SchoolId>,
    /// School of the row's department.
    pub department_school_id: Option<SchoolId>,
}

impl RowFilter {
    /// Builds the filter for a context and key; `None` means unrestricted.
    #[must_use]
    pub fn for_context(context: &PrincipalContext, key: &PermissionKey) -> Option<Self> {
        Self::for_scope(context, context.scope_for(key))
    }

    fn for_scope(context: &PrincipalContext, scope: AccessScope) -> Option<Self> {
        if context.is_superadmin() {
            return None;
        }

        let Some(principal_id) = context.principal_id() else {
            return (scope != AccessScope::All).then_some(Self::NoRows);
        };

        match scope {
            AccessScope::All => None,
            AccessScope::School => Some(Self::SchoolMembership {
                school_ids: context.school_ids().clone(),
            }),
            AccessScope::Department => Some(Self::DepartmentOrOwner {
                department_ids: context.department_ids().clone(),
                owner_id: principal_id,
            }),
            AccessScope::Own => Some(Self::Owner {
                owner_id: principal_id,
            }),
        }
    }

    /// Evaluates the filter against one row.
    #[must_use]
    pub fn matches(&self, row: &RowAttributes) -> bool {
        match self {
            Self::SchoolMembership { school_ids } => {
                row.school_id.is_some_and(|id| school_ids.contains(&id))
                    || row
                        .department_school_id
                        .is_some_and(|id| school_ids.contains(&id))
            }
            Self::DepartmentOrOwner {
                department_ids,
                owner_id,
            } => {
                row.department_id
                    .is_some_and(|id| department_ids.contains(&id))
                    || row.owner_id == Some(*owner_id)
            }
            Self::Owner { owner_id } => row.owner_id == Some(*owner_id),
            Self::NoRows => false,
        }
    }
}

impl From<&EntityOwnership> for RowAttributes {
    fn from(value: &EntityOwnership) -> Self {
        Self {
            owner_id: value.owner_id,
            department_id: value.department_id,
            school_id: value.school_id,
            department_school_id: value.department_school_id,
        }
    }
}

/// Decides whether a resolved scope admits one specific record.
///
/// Uses the same predicate a list query would receive, so a record visible
/// in a filtered listing is also accessible on its own.
#[must_use]
pub fn scope_admits_record(
    context: &PrincipalContext,
    scope: AccessScope,
    record: &EntityOwnership,
) -> bool {
    RowFilter::for_scope(context, scope)
        .is_none_or(|filter| filter.matches(&RowAttributes::from(record)))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::{RowAttributes, RowFilter, scope_admits_record};
    use crate::{
        AccessScope, DepartmentId, EntityOwnership, OrganizationMemberships, PermissionAction,
        PermissionKey, PrincipalContext, PrincipalId, SchoolId,
    };

    fn key(resource: &str) -> PermissionKey {
        match PermissionKey::new(resource, PermissionAction::Read) {
            Ok(key) => key,
            Err(error) => panic!("invalid test key: {error}"),
        }
    }

    fn context_with_scope(
        principal_id: PrincipalId,
        scope: AccessScope,
        memberships: OrganizationMemberships,
    ) -> PrincipalContext {
        PrincipalContext::new(
            principal_id,
            false,
            scope,
            memberships,
            BTreeMap::from([(key("organization"), scope)]),
        )
    }

    #[test]
    fn superadmin_gets_no_filter() {
        let context = PrincipalContext::new(
            PrincipalId::new(),
            true,
            AccessScope::All,
            OrganizationMemberships::default(),
            BTreeMap::new(),
        );

        assert_eq!(RowFilter::for_context(&context, &key("anything")), None);
    }

    #[test]
    fn school_filter_matches_school_and_department_school() {
        let school_id = SchoolId::new();
        let context = context_with_scope(
            PrincipalId::new(),
            AccessScope::School,
            OrganizationMemberships {
                school_ids: BTreeSet::from([school_id]),
                ..OrganizationMemberships::default()
            },
        );

        let Some(filter) = RowFilter::for_context(&context, &key("organization")) else {
            panic!("school scope must restrict rows");
        };

        assert!(filter.matches(&RowAttributes {
            school_id: Some(school_id),
            ..RowAttributes::default()
        }));
        assert!(filter.matches(&RowAttributes {
            department_school_id: Some(school_id),
            ..RowAttributes::default()
        }));
        assert!(!filter.matches(&RowAttributes {
            school_id: Some(SchoolId::new()),
            ..RowAttributes::default()
        }));
    }

    #[test]
    fn missing_scope_entry_defaults_to_owner_filter() {
        let principal_id = PrincipalId::new();
        let context = context_with_scope(
            principal_id,
            AccessScope::All,
            OrganizationMemberships::default(),
        );

        assert_eq!(
            RowFilter::for_context(&context, &key("payroll")),
            Some(RowFilter::Owner {
                owner_id: principal_id
            })
        );
    }

    #[test]
    fn department_filter_keeps_own_rows_visible() {
        let principal_id = PrincipalId::new();
        let context = context_with_scope(
            principal_id,
            AccessScope::Department,
            OrganizationMemberships {
                department_ids: BTreeSet::from([DepartmentId::new()]),
                ..OrganizationMemberships::default()
            },
        );

        let Some(filter) = RowFilter::for_context(&context, &key("organization")) else {
            panic!("department scope must restrict rows");
        };

        assert!(filter.matches(&RowAttributes {
            owner_id: Some(principal_id),
            department_id: Some(DepartmentId::new()),
            ..RowAttributes::default()
        }));
        assert!(!filter.matches(&RowAttributes {
            department_id: Some(DepartmentId::new()),
            ..RowAttributes::default()
        }));
    }

    #[test]
    fn unprovisioned_context_sees_no_rows() {
        assert_eq!(
            RowFilter::for_context(&PrincipalContext::unprovisioned(), &key("organization")),
            Some(RowFilter::NoRows)
        );
    }

    #[test]
    fn record_outside_department_falls_back_to_ownership() {
        let principal_id = PrincipalId::new();
        let context = context_with_scope(
            principal_id,
            AccessScope::Department,
            OrganizationMemberships::default(),
        );

        let owned = EntityOwnership {
            owner_id: Some(principal_id),
            department_id: Some(DepartmentId::new()),
            ..EntityOwnership::default()
        };
        let foreign = EntityOwnership {
            owner_id: Some(PrincipalId::new()),
            ..owned.clone()
        };

        assert!(scope_admits_record(&context, AccessScope::Department, &owned));
        assert!(!scope_admits_record(&context, AccessScope::Department, &foreign));
    }

    #[test]
    fn own_scope_requires_strict_ownership() {
        let context = context_with_scope(
            PrincipalId::new(),
            AccessScope::Own,
            OrganizationMemberships::default(),
        );

        assert!(!scope_admits_record(
            &context,
            AccessScope::Own,
            &EntityOwnership::default()
        ));
    }

    #[test]
    fn record_check_agrees_with_list_filter_on_department_school() {
        let member_school = SchoolId::new();
        let context = context_with_scope(
            PrincipalId::new(),
            AccessScope::School,
            OrganizationMemberships {
                school_ids: BTreeSet::from([member_school]),
                ..OrganizationMemberships::default()
            },
        );
        let record = EntityOwnership {
            department_id: Some(DepartmentId::new()),
            school_id: Some(SchoolId::new()),
            department_school_id: Some(member_school),
            ..EntityOwnership::default()
        };

        let Some(filter) = RowFilter::for_context(&context, &key("organization")) else {
            panic!("school scope must restrict rows");
        };
        assert!(filter.matches(&RowAttributes::from(&record)));
        assert!(scope_admits_record(&context, AccessScope::School, &record));
    }
}
