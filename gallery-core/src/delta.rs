//! Change descriptions produced by the external change feed.
//!
//! A `ChangeDelta` describes what happened between two handles of the same
//! source. Index conventions:
//!
//! ```text
//! removed   — positions in the pre-change list
//! inserted  — positions after removals, consumed in ascending order
//! changed   — positions after insertions
//! moves     — applied last, in the order given, on the current list
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One change reported by the feed, generic over the element type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDelta<T> {
    pub removed: BTreeSet<usize>,
    pub inserted: Vec<(usize, T)>,
    /// Changed index paired with the object after the change.
    pub changed: Vec<(usize, T)>,
    pub moves: Vec<(usize, usize)>,
}

impl<T> Default for ChangeDelta<T> {
    fn default() -> Self {
        Self {
            removed: BTreeSet::new(),
            inserted: Vec::new(),
            changed: Vec::new(),
            moves: Vec::new(),
        }
    }
}

impl<T> ChangeDelta<T> {
    /// An empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removing(mut self, index: usize) -> Self {
        self.removed.insert(index);
        self
    }

    pub fn inserting(mut self, index: usize, item: T) -> Self {
        self.inserted.push((index, item));
        self
    }

    pub fn changing(mut self, index: usize, item: T) -> Self {
        self.changed.push((index, item));
        self
    }

    pub fn moving(mut self, from: usize, to: usize) -> Self {
        self.moves.push((from, to));
        self
    }

    /// Whether any component carries a change.
    pub fn has_changes(&self) -> bool {
        !self.removed.is_empty()
            || !self.inserted.is_empty()
            || !self.changed.is_empty()
            || !self.moves.is_empty()
    }

    /// The set of changed indices.
    pub fn changed_indices(&self) -> BTreeSet<usize> {
        self.changed.iter().map(|(index, _)| *index).collect()
    }

    /// Convert the carried elements, keeping every index untouched.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ChangeDelta<U> {
        ChangeDelta {
            removed: self.removed,
            inserted: self.inserted.into_iter().map(|(i, t)| (i, f(t))).collect(),
            changed: self.changed.into_iter().map(|(i, t)| (i, f(t))).collect(),
            moves: self.moves,
        }
    }
}
