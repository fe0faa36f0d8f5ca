use std::collections::{BTreeMap, VecDeque};

use orgaccess_core::AppResult;
use orgaccess_domain::RoleId;
use tracing::warn;

use crate::PermissionRepository;

/// Which hierarchy edges a walk follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeFilter {
    /// Every parent edge.
    All,
    /// Only edges with `inherit_permissions = true`.
    Inheriting,
}

/// Ancestors reached from a set of roles with their shortest distance.
#[derive(Debug, Clone, Default)]
pub(crate) struct AncestorWalk {
    depths: BTreeMap<RoleId, usize>,
    truncated: bool,
}

impl AncestorWalk {
    /// Returns every reached role, starting roles included at depth zero.
    pub(crate) fn roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.depths.keys().copied()
    }

    pub(crate) fn contains(&self, role_id: RoleId) -> bool {
        self.depths.contains_key(&role_id)
    }

    /// Length of the longest shortest-path seen.
    pub(crate) fn max_depth(&self) -> usize {
        self.depths.values().copied().max().unwrap_or(0)
    }

    pub(crate) fn was_truncated(&self) -> bool {
        self.truncated
    }
}

/// Breadth-first walk up the role hierarchy.
///
/// A visited set guards against cyclic data; edges beyond `max_depth` are not
/// followed and mark the walk as truncated.
pub(crate) async fn walk_ancestors(
    repository: &dyn PermissionRepository,
    start: &[RoleId],
    filter: EdgeFilter,
    max_depth: usize,
) -> AppResult<AncestorWalk> {
    let mut walk = AncestorWalk::default();
    let mut queue = VecDeque::new();

    for role_id in start {
        if walk.depths.insert(*role_id, 0).is_none() {
            queue.push_back((*role_id, 0_usize));
        }
    }

    while let Some((role_id, depth)) = queue.pop_front() {
        let edges = repository.list_parent_roles(role_id).await?;
        for edge in edges {
            if filter == EdgeFilter::Inheriting && !edge.inherit_permissions {
                continue;
            }
            if walk.depths.contains_key(&edge.parent_role_id) {
                continue;
            }
            if depth + 1 > max_depth {
                walk.truncated = true;
                warn!(
                    %role_id,
                    parent_role_id = %edge.parent_role_id,
                    max_depth,
                    "role hierarchy walk exceeded maximum depth"
                );
                continue;
            }

            walk.depths.insert(edge.parent_role_id, depth + 1);
            queue.push_back((edge.parent_role_id, depth + 1));
        }
    }

    Ok(walk)
}
