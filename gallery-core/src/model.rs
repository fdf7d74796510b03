//! Item, section and snapshot value types.
//!
//! A `Snapshot` is the ordered, section-partitioned list the grid renders.
//! Every `ItemId` lives in at most one section, and an item keeps its identity
//! until it is removed; reconfiguration only swaps its payload.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::delta::ChangeDelta;
use crate::edit::EditScript;
use crate::groups::GroupObject;
use crate::reconcile::{DiffReconciler, Identified};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Section not found: {0}")]
    UnknownSection(SectionId),
    #[error("Section already present: {0}")]
    DuplicateSection(SectionId),
    #[error("Item already present in the snapshot: {0}")]
    DuplicateItem(ItemId),
}

/// Stable item identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One grid entry: identity plus a reference to the underlying asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Platform asset identifier used to load the payload.
    pub asset: String,
}

impl Item {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            asset: asset.into(),
        }
    }

    pub fn with_id(id: ItemId, asset: impl Into<String>) -> Self {
        Self {
            id,
            asset: asset.into(),
        }
    }
}

impl Identified for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(String);

impl SectionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The single section the photo grid uses.
    pub fn images() -> Self {
        Self::new("images")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SectionId {
    fn default() -> Self {
        Self::images()
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which backing source feeds the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSelector {
    AllItems,
    FilteredByGroup(GroupObject),
}

impl SourceSelector {
    pub fn group(&self) -> Option<&GroupObject> {
        match self {
            SourceSelector::AllItems => None,
            SourceSelector::FilteredByGroup(group) => Some(group),
        }
    }
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelector::AllItems => f.write_str("all items"),
            SourceSelector::FilteredByGroup(group) => write!(f, "group \"{}\"", group.title),
        }
    }
}

/// Ordered, section-partitioned item list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    sections: Vec<SectionId>,
    items: HashMap<SectionId, Vec<Item>>,
    /// Identity index for the at-most-one-section invariant.
    owners: HashMap<ItemId, SectionId>,
    reconfigured: Vec<ItemId>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full-load constructor: one section holding `items` in order.
    pub fn with_items(
        section: SectionId,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<Self, SnapshotError> {
        let mut snapshot = Self::new();
        snapshot.append_section(section.clone())?;
        snapshot.append_items(&section, items)?;
        Ok(snapshot)
    }

    pub fn append_section(&mut self, section: SectionId) -> Result<(), SnapshotError> {
        if self.items.contains_key(&section) {
            return Err(SnapshotError::DuplicateSection(section));
        }
        self.items.insert(section.clone(), Vec::new());
        self.sections.push(section);
        Ok(())
    }

    pub fn append_items(
        &mut self,
        section: &SectionId,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<(), SnapshotError> {
        let list = self
            .items
            .get_mut(section)
            .ok_or_else(|| SnapshotError::UnknownSection(section.clone()))?;

        for item in items {
            if self.owners.contains_key(&item.id) {
                return Err(SnapshotError::DuplicateItem(item.id));
            }
            self.owners.insert(item.id, section.clone());
            list.push(item);
        }
        Ok(())
    }

    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    /// Items of `section` in display order (empty for an unknown section).
    pub fn items(&self, section: &SectionId) -> &[Item] {
        self.items.get(section).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn item_ids(&self, section: &SectionId) -> Vec<ItemId> {
        self.items(section).iter().map(|item| item.id).collect()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        let section = self.owners.get(&id)?;
        self.items(section).iter().find(|item| item.id == id)
    }

    pub fn section_of(&self, id: ItemId) -> Option<&SectionId> {
        self.owners.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.owners.contains_key(&id)
    }

    /// Total number of items across sections.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Items flagged changed by the reconciliation that produced this snapshot.
    pub fn reconfigured_items(&self) -> &[ItemId] {
        &self.reconfigured
    }

    /// Apply `delta` to `section`, returning the next snapshot and its edits.
    ///
    /// An empty delta yields an identical snapshot and an empty script.
    ///
    /// # Panics
    /// Panics on deltas that do not fit the section (see [`DiffReconciler::apply`]).
    pub fn reconciled(
        &self,
        section: &SectionId,
        delta: &ChangeDelta<Item>,
        reconciler: &DiffReconciler,
    ) -> Result<(Snapshot, EditScript<Item>), SnapshotError> {
        let current = self
            .items
            .get(section)
            .ok_or_else(|| SnapshotError::UnknownSection(section.clone()))?;

        if !delta.has_changes() {
            return Ok((self.clone(), EditScript::new()));
        }

        let out = reconciler.apply(current, delta);

        let mut next = self.clone();
        next.owners.retain(|_, owner| owner != section);
        for item in &out.list {
            if next.owners.insert(item.id, section.clone()).is_some() {
                return Err(SnapshotError::DuplicateItem(item.id));
            }
        }
        next.items.insert(section.clone(), out.list);
        next.reconfigured = out.reconfigured;

        Ok((next, out.edits))
    }
}
