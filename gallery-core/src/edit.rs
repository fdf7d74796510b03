//! Ordered structural edits emitted by a reconciliation.
//!
//! Every edit is positional and relative to the list as left by the previous
//! edit, so an incremental consumer can apply them one by one.

use serde::{Deserialize, Serialize};

/// A single structural edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edit<T> {
    Remove { index: usize, item: T },
    Insert { index: usize, item: T },
    /// Element kept in place; `item` is its post-change value.
    Reconfigure { index: usize, item: T },
    /// Remove at `from`, then insert at `to` (both on the current list).
    Move { from: usize, to: usize, item: T },
}

impl<T> Edit<T> {
    pub fn item(&self) -> &T {
        match self {
            Edit::Remove { item, .. }
            | Edit::Insert { item, .. }
            | Edit::Reconfigure { item, .. }
            | Edit::Move { item, .. } => item,
        }
    }
}

/// Ordered sequence of edits turning one list into the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditScript<T> {
    edits: Vec<Edit<T>>,
}

impl<T> Default for EditScript<T> {
    fn default() -> Self {
        Self { edits: Vec::new() }
    }
}

impl<T> EditScript<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, edit: Edit<T>) {
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn edits(&self) -> &[Edit<T>] {
        &self.edits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edit<T>> {
        self.edits.iter()
    }

    pub fn into_edits(self) -> Vec<Edit<T>> {
        self.edits
    }

    /// Number of `Reconfigure` edits.
    pub fn reconfigure_count(&self) -> usize {
        self.edits
            .iter()
            .filter(|e| matches!(e, Edit::Reconfigure { .. }))
            .count()
    }
}

impl<T: Clone> EditScript<T> {
    /// Apply the script to `list` in order.
    ///
    /// # Panics
    /// Panics when an edit does not fit the list, i.e. the script was produced
    /// for a different input.
    pub fn replay(&self, list: &mut Vec<T>) {
        for edit in &self.edits {
            match edit {
                Edit::Remove { index, .. } => {
                    list.remove(*index);
                }
                Edit::Insert { index, item } => list.insert(*index, item.clone()),
                Edit::Reconfigure { index, item } => list[*index] = item.clone(),
                Edit::Move { from, to, .. } => {
                    let moved = list.remove(*from);
                    list.insert(*to, moved);
                }
            }
        }
    }
}

impl<'a, T> IntoIterator for &'a EditScript<T> {
    type Item = &'a Edit<T>;
    type IntoIter = std::slice::Iter<'a, Edit<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}
