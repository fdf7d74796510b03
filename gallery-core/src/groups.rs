//! Album menu model: groups split by kind, merged into one index.
//!
//! ```text
//! Smart list   ── delta ──► DiffReconciler ──┐
//!                                            ├──► CollectionsIndex (whole map)
//! Regular list ── delta ──► DiffReconciler ──┘
//! ```
//!
//! A kind without groups is an absent entry, never an empty list.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delta::ChangeDelta;
use crate::reconcile::{DiffReconciler, Identified, ReconcileStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Menu category. Ordered as shown in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupKind {
    /// System-maintained albums (Favorites, Screenshots, ...)
    Smart,
    /// User albums
    Regular,
}

impl GroupKind {
    pub const ALL: [GroupKind; 2] = [GroupKind::Smart, GroupKind::Regular];
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupObject {
    pub id: GroupId,
    pub title: String,
    pub kind: GroupKind,
}

impl GroupObject {
    pub fn new(title: impl Into<String>, kind: GroupKind) -> Self {
        Self::with_id(GroupId::new(), title, kind)
    }

    pub fn with_id(id: GroupId, title: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            id,
            title: title.into(),
            kind,
        }
    }
}

impl Identified for GroupObject {
    type Id = GroupId;

    fn id(&self) -> GroupId {
        self.id
    }
}

/// Groups per kind, each list in menu order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsIndex {
    groups: BTreeMap<GroupKind, Vec<GroupObject>>,
}

impl CollectionsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from per-kind lists; empty lists are left out.
    pub fn from_lists(lists: impl IntoIterator<Item = (GroupKind, Vec<GroupObject>)>) -> Self {
        let mut index = Self::new();
        for (kind, list) in lists {
            index.set(kind, list);
        }
        index
    }

    /// Replace the list of `kind`; an empty list removes the entry.
    pub fn set(&mut self, kind: GroupKind, list: Vec<GroupObject>) {
        if list.is_empty() {
            self.groups.remove(&kind);
        } else {
            self.groups.insert(kind, list);
        }
    }

    pub fn get(&self, kind: GroupKind) -> Option<&[GroupObject]> {
        self.groups.get(&kind).map(Vec::as_slice)
    }

    pub fn kinds(&self) -> impl Iterator<Item = GroupKind> + '_ {
        self.groups.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupKind, &[GroupObject])> + '_ {
        self.groups.iter().map(|(kind, list)| (*kind, list.as_slice()))
    }

    /// Look a group up by identity across both kinds.
    pub fn find(&self, id: GroupId) -> Option<&GroupObject> {
        self.groups.values().flatten().find(|group| group.id == id)
    }

    /// Total number of groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Keeps a `CollectionsIndex` in step with per-kind deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupsIndexSynchronizer {
    reconciler: DiffReconciler,
}

impl GroupsIndexSynchronizer {
    pub fn new(strategy: ReconcileStrategy) -> Self {
        Self {
            reconciler: DiffReconciler::new(strategy),
        }
    }

    /// Swap moves and remove-then-reinsert changes.
    pub fn legacy() -> Self {
        Self::new(ReconcileStrategy::LEGACY_GROUPS)
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        self.reconciler.strategy()
    }

    /// Apply per-kind deltas to `index`.
    ///
    /// Returns the whole merged index when at least one kind changed, `None`
    /// otherwise. A kind missing from `index` starts from an empty list.
    ///
    /// # Panics
    /// Panics on deltas that do not fit their list.
    pub fn apply(
        &self,
        index: &CollectionsIndex,
        deltas: &BTreeMap<GroupKind, ChangeDelta<GroupObject>>,
    ) -> Option<CollectionsIndex> {
        let mut next = index.clone();
        let mut changed = false;

        for (kind, delta) in deltas {
            if !delta.has_changes() {
                continue;
            }
            let current = index.get(*kind).unwrap_or(&[]);
            let out = self.reconciler.apply(current, delta);
            log::debug!(
                "{kind:?} groups: {} -> {} ({} edits)",
                current.len(),
                out.list.len(),
                out.edits.len()
            );
            next.set(*kind, out.list);
            changed = true;
        }

        changed.then_some(next)
    }
}
