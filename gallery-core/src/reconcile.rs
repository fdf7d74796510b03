//! Delta reconciliation for identity-stable ordered lists.
//!
//! `DiffReconciler::apply` turns `(current list, ChangeDelta)` into
//! `(next list, EditScript)`. The steps always run in the same order, each on
//! the list left by the previous one:
//!
//! ```text
//! removals (descending) → insertions (ascending) → changes → moves (as given)
//! ```
//!
//! Two behaviors are configurable through [`ReconcileStrategy`]:
//!
//! | Strategy                    | Moves                              | Changes            |
//! |-----------------------------|------------------------------------|--------------------|
//! | default                     | `Relocate` (remove + insert)       | `InPlace`          |
//! | `LEGACY_ITEMS`              | `AnchorExchange` (two anchor moves) | `InPlace`          |
//! | `LEGACY_GROUPS`             | `Swap`                             | `Reinsert`         |
//!
//! `AnchorExchange` and `Swap` only equal a clean relocation for adjacent
//! exchanges; they are kept for consumers that depend on the old ordering.
//!
//! A delta that does not fit the list (index out of range, changed object with
//! a different identity) is a broken change feed and panics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::delta::ChangeDelta;
use crate::edit::{Edit, EditScript};

/// Elements with a stable identity.
pub trait Identified {
    type Id: Clone + PartialEq + fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// How a `(from, to)` move is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStrategy {
    /// Remove the element at `from` and insert it at `to`.
    #[default]
    Relocate,
    /// Legacy item algorithm built from two anchor moves.
    AnchorExchange,
    /// Legacy group algorithm: exchange the elements at `from` and `to`.
    Swap,
}

/// How a changed index is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStrategy {
    /// Replace the element in place and emit `Reconfigure`.
    #[default]
    InPlace,
    /// Remove and re-insert at the same index.
    Reinsert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileStrategy {
    pub moves: MoveStrategy,
    pub changes: ChangeStrategy,
}

impl ReconcileStrategy {
    pub const LEGACY_ITEMS: Self = Self {
        moves: MoveStrategy::AnchorExchange,
        changes: ChangeStrategy::InPlace,
    };

    pub const LEGACY_GROUPS: Self = Self {
        moves: MoveStrategy::Swap,
        changes: ChangeStrategy::Reinsert,
    };
}

/// Output of one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T: Identified> {
    pub list: Vec<T>,
    pub edits: EditScript<T>,
    /// Identities touched by the change step, in processing order.
    pub reconfigured: Vec<T::Id>,
}

/// Applies change deltas to ordered lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffReconciler {
    strategy: ReconcileStrategy,
}

impl DiffReconciler {
    pub fn new(strategy: ReconcileStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        self.strategy
    }

    /// Reconcile `current` with `delta`.
    ///
    /// An empty delta returns `current` unchanged with an empty script.
    ///
    /// # Panics
    /// Panics when the delta references an index outside the list or replaces
    /// an element with an object of another identity.
    pub fn apply<T>(&self, current: &[T], delta: &ChangeDelta<T>) -> Reconciled<T>
    where
        T: Identified + Clone,
    {
        let mut pass = Pass {
            list: current.to_vec(),
            edits: EditScript::new(),
            reconfigured: Vec::new(),
        };

        if !delta.has_changes() {
            return pass.finish();
        }

        pass.remove_all(delta);
        pass.insert_all(delta);
        pass.change_all(delta, self.strategy.changes);
        for &(from, to) in &delta.moves {
            pass.move_one(from, to, self.strategy.moves);
        }

        log::trace!(
            "reconciled {} -> {} elements with {} edits",
            current.len(),
            pass.list.len(),
            pass.edits.len()
        );
        pass.finish()
    }
}

/// Working state of a single `apply` call.
struct Pass<T: Identified> {
    list: Vec<T>,
    edits: EditScript<T>,
    reconfigured: Vec<T::Id>,
}

impl<T: Identified + Clone> Pass<T> {
    fn finish(self) -> Reconciled<T> {
        Reconciled {
            list: self.list,
            edits: self.edits,
            reconfigured: self.reconfigured,
        }
    }

    fn remove_all(&mut self, delta: &ChangeDelta<T>) {
        for &index in delta.removed.iter().rev() {
            let len = self.list.len();
            assert!(index < len, "removal index {index} out of range for {len} elements");
            let item = self.list.remove(index);
            self.edits.push(Edit::Remove { index, item });
        }
    }

    fn insert_all(&mut self, delta: &ChangeDelta<T>) {
        let mut ordered: Vec<&(usize, T)> = delta.inserted.iter().collect();
        ordered.sort_by_key(|(index, _)| *index);

        for (index, item) in ordered {
            let index = *index;
            let len = self.list.len();
            assert!(index <= len, "insertion index {index} out of range for {len} elements");
            if index == len {
                self.list.push(item.clone());
            } else {
                // Lands immediately before the element currently at `index`.
                self.list.insert(index, item.clone());
            }
            self.edits.push(Edit::Insert { index, item: item.clone() });
        }
    }

    fn change_all(&mut self, delta: &ChangeDelta<T>, strategy: ChangeStrategy) {
        let mut ordered: Vec<&(usize, T)> = delta.changed.iter().collect();
        ordered.sort_by_key(|(index, _)| *index);

        for (index, item) in ordered {
            let index = *index;
            let len = self.list.len();
            assert!(index < len, "changed index {index} out of range for {len} elements");
            let id = self.list[index].id();
            assert_eq!(
                id,
                item.id(),
                "changed object at index {index} does not carry the identity it replaces"
            );

            match strategy {
                ChangeStrategy::InPlace => {
                    self.list[index] = item.clone();
                    self.edits.push(Edit::Reconfigure { index, item: item.clone() });
                }
                ChangeStrategy::Reinsert => {
                    let old = self.list.remove(index);
                    self.edits.push(Edit::Remove { index, item: old });
                    self.list.insert(index, item.clone());
                    self.edits.push(Edit::Insert { index, item: item.clone() });
                }
            }
            self.reconfigured.push(id);
        }
    }

    fn move_one(&mut self, from: usize, to: usize, strategy: MoveStrategy) {
        let len = self.list.len();
        assert!(
            from < len && to < len,
            "move ({from}, {to}) out of range for {len} elements"
        );
        if from == to {
            return;
        }

        match strategy {
            MoveStrategy::Relocate => self.relocate(from, to),
            MoveStrategy::Swap => {
                let (low, high) = (from.min(to), from.max(to));
                self.relocate(low, high);
                self.relocate(high - 1, low);
            }
            MoveStrategy::AnchorExchange => self.anchor_exchange(from, to),
        }
    }

    fn relocate(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let item = self.list.remove(from);
        self.list.insert(to, item.clone());
        self.edits.push(Edit::Move { from, to, item });
    }

    fn anchor_exchange(&mut self, from: usize, to: usize) {
        let from_id = self.list[from].id();
        let to_id = self.list[to].id();

        if from < to {
            let before_to = self.list[to - 1].id();
            self.move_after(&to_id, Some(&from_id));
            if before_to == from_id {
                // Anchored on itself: it takes the slot at `to`.
                let current = self.position(&from_id);
                self.relocate(current, to);
            } else {
                self.move_after(&from_id, Some(&before_to));
            }
        } else if from == to + 1 {
            // Anchoring `to` after its own predecessor changes nothing; swap
            // the neighbours like the forward case does.
            self.relocate(from, to);
        } else {
            let before_to = to.checked_sub(1).map(|i| self.list[i].id());
            self.move_after(&from_id, Some(&to_id));
            self.move_after(&to_id, before_to.as_ref());
        }
    }

    /// Move `moving` right after `anchor`, or to the front when there is none.
    fn move_after(&mut self, moving: &T::Id, anchor: Option<&T::Id>) {
        let from = self.position(moving);
        let item = self.list.remove(from);
        let to = match anchor {
            Some(anchor) => self.position(anchor) + 1,
            None => 0,
        };
        self.list.insert(to, item.clone());
        if from != to {
            self.edits.push(Edit::Move { from, to, item });
        }
    }

    fn position(&self, id: &T::Id) -> usize {
        match self.list.iter().position(|e| e.id() == *id) {
            Some(index) => index,
            None => unreachable!("element {id:?} vanished during reconciliation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Identified for char {
        type Id = char;

        fn id(&self) -> char {
            *self
        }
    }

    /// Element whose payload can change under a fixed identity.
    #[derive(Debug, Clone, PartialEq)]
    struct Tile {
        id: char,
        revision: u32,
    }

    impl Identified for Tile {
        type Id = char;

        fn id(&self) -> char {
            self.id
        }
    }

    fn tiles(ids: &str) -> Vec<Tile> {
        ids.chars().map(|id| Tile { id, revision: 0 }).collect()
    }

    fn list(ids: &str) -> Vec<char> {
        ids.chars().collect()
    }

    fn apply(strategy: ReconcileStrategy, current: &str, delta: ChangeDelta<char>) -> Vec<char> {
        DiffReconciler::new(strategy).apply(&list(current), &delta).list
    }

    fn moves(strategy: MoveStrategy) -> ReconcileStrategy {
        ReconcileStrategy {
            moves: strategy,
            ..ReconcileStrategy::default()
        }
    }

    #[test]
    fn test_removals_run_descending() {
        let delta = ChangeDelta::new().removing(1).removing(3);
        let out = DiffReconciler::default().apply(&list("ABCD"), &delta);

        assert_eq!(out.list, list("AC"));
        assert_eq!(
            out.edits.edits(),
            &[
                Edit::Remove { index: 3, item: 'D' },
                Edit::Remove { index: 1, item: 'B' },
            ]
        );
    }

    #[test]
    fn test_insert_into_empty_list_appends() {
        let delta = ChangeDelta::new().inserting(0, 'X');
        let out = DiffReconciler::default().apply(&[], &delta);

        assert_eq!(out.list, vec!['X']);
        assert_eq!(out.edits.edits(), &[Edit::Insert { index: 0, item: 'X' }]);
    }

    #[test]
    fn test_insert_at_length_appends() {
        let out = apply(ReconcileStrategy::default(), "AB", ChangeDelta::new().inserting(2, 'Z'));
        assert_eq!(out, list("ABZ"));
    }

    #[test]
    fn test_insertions_consumed_ascending() {
        let delta = ChangeDelta::new().inserting(3, 'Y').inserting(0, 'X');
        let out = apply(ReconcileStrategy::default(), "ABC", delta);
        assert_eq!(out, list("XABYC"));
    }

    #[test]
    fn test_reconfigure_keeps_order_and_identity() {
        let current = tiles("ABC");
        let delta = ChangeDelta::new().changing(1, Tile { id: 'B', revision: 7 });
        let out = DiffReconciler::default().apply(&current, &delta);

        let ids: Vec<char> = out.list.iter().map(|t| t.id).collect();
        assert_eq!(ids, list("ABC"));
        assert_eq!(out.list[1].revision, 7);
        assert_eq!(out.reconfigured, vec!['B']);
        assert_eq!(out.edits.len(), 1);
        assert_eq!(out.edits.reconfigure_count(), 1);
        assert_eq!(out.edits.edits()[0].item().id, 'B');
    }

    #[test]
    fn test_reinsert_changes_emit_remove_then_insert() {
        let strategy = ReconcileStrategy::LEGACY_GROUPS;
        let delta = ChangeDelta::new().changing(1, 'B');
        let out = DiffReconciler::new(strategy).apply(&list("ABC"), &delta);

        assert_eq!(out.list, list("ABC"));
        assert_eq!(
            out.edits.edits(),
            &[
                Edit::Remove { index: 1, item: 'B' },
                Edit::Insert { index: 1, item: 'B' },
            ]
        );
        assert_eq!(out.reconfigured, vec!['B']);
    }

    #[test]
    fn test_anchor_exchange_spanning_move_exchanges_ends() {
        let out = apply(moves(MoveStrategy::AnchorExchange), "ABCD", ChangeDelta::new().moving(0, 2));
        // Not a relocation of A: C and A trade places, B stays put.
        assert_eq!(out, list("CBAD"));
    }

    #[test]
    fn test_anchor_exchange_adjacent_move_is_swap() {
        let out = apply(moves(MoveStrategy::AnchorExchange), "ABCD", ChangeDelta::new().moving(1, 2));
        assert_eq!(out, list("ACBD"));
    }

    #[test]
    fn test_anchor_exchange_adjacent_backward_move_is_swap() {
        let out = DiffReconciler::new(moves(MoveStrategy::AnchorExchange))
            .apply(&list("ABCD"), &ChangeDelta::new().moving(2, 1));
        assert_eq!(out.list, list("ACBD"));
        assert_eq!(out.edits.len(), 1);
        assert_eq!(out.edits.edits()[0], Edit::Move { from: 2, to: 1, item: 'C' });
    }

    #[test]
    fn test_anchor_exchange_backward_move() {
        let strategy = moves(MoveStrategy::AnchorExchange);
        assert_eq!(apply(strategy, "ABCD", ChangeDelta::new().moving(3, 1)), list("ABDC"));
        assert_eq!(apply(strategy, "ABCD", ChangeDelta::new().moving(2, 0)), list("ACBD"));
    }

    #[test]
    fn test_relocate_moves_a_single_element() {
        let strategy = moves(MoveStrategy::Relocate);
        assert_eq!(apply(strategy, "ABCD", ChangeDelta::new().moving(0, 2)), list("BCAD"));
        assert_eq!(apply(strategy, "ABCD", ChangeDelta::new().moving(3, 0)), list("DABC"));
        assert_eq!(apply(strategy, "ABCD", ChangeDelta::new().moving(1, 2)), list("ACBD"));
    }

    #[test]
    fn test_swap_exchanges_positions() {
        let strategy = moves(MoveStrategy::Swap);
        assert_eq!(apply(strategy, "ABCD", ChangeDelta::new().moving(0, 3)), list("DBCA"));
        assert_eq!(apply(strategy, "ABCD", ChangeDelta::new().moving(2, 1)), list("ACBD"));
    }

    #[test]
    fn test_moves_apply_in_given_order() {
        let delta = ChangeDelta::new().moving(0, 3).moving(0, 1);
        // ABCD -> BCDA -> CBDA
        assert_eq!(apply(ReconcileStrategy::default(), "ABCD", delta), list("CBDA"));
    }

    #[test]
    fn test_move_onto_itself_is_noop() {
        let out = DiffReconciler::default().apply(&list("ABC"), &ChangeDelta::new().moving(1, 1));
        assert_eq!(out.list, list("ABC"));
        assert!(out.edits.is_empty());
    }

    #[test]
    fn test_empty_delta_returns_input_unchanged() {
        for strategy in [
            ReconcileStrategy::default(),
            ReconcileStrategy::LEGACY_ITEMS,
            ReconcileStrategy::LEGACY_GROUPS,
        ] {
            let out = DiffReconciler::new(strategy).apply(&list("ABC"), &ChangeDelta::new());
            assert_eq!(out.list, list("ABC"));
            assert!(out.edits.is_empty());
            assert!(out.reconfigured.is_empty());
        }
    }

    #[test]
    fn test_combined_delta_follows_step_order() {
        let delta = ChangeDelta::new()
            .removing(0)
            .inserting(2, 'X')
            .changing(0, 'B')
            .moving(3, 0);
        // ABCDE -> BCDE -> BCXDE -> (B reconfigured) -> DBCXE
        let out = DiffReconciler::default().apply(&list("ABCDE"), &delta);
        assert_eq!(out.list, list("DBCXE"));
        assert_eq!(out.reconfigured, vec!['B']);
    }

    #[test]
    fn test_edit_script_replays_to_result() {
        let delta = ChangeDelta::new()
            .removing(1)
            .removing(4)
            .inserting(0, 'X')
            .inserting(4, 'Y')
            .changing(2, 'C')
            .moving(0, 3)
            .moving(4, 1);
        let input = list("ABCDEF");

        for strategy in [
            ReconcileStrategy::default(),
            ReconcileStrategy::LEGACY_ITEMS,
            ReconcileStrategy::LEGACY_GROUPS,
        ] {
            let out = DiffReconciler::new(strategy).apply(&input, &delta);
            let mut replayed = input.clone();
            out.edits.replay(&mut replayed);
            assert_eq!(replayed, out.list, "strategy {strategy:?}");
        }
    }

    #[test]
    #[should_panic(expected = "removal index 4 out of range")]
    fn test_removal_out_of_range_panics() {
        DiffReconciler::default().apply(&list("ABC"), &ChangeDelta::new().removing(4));
    }

    #[test]
    #[should_panic(expected = "insertion index 2 out of range")]
    fn test_insertion_past_end_panics() {
        DiffReconciler::default().apply(&list("A"), &ChangeDelta::new().inserting(2, 'X'));
    }

    #[test]
    #[should_panic(expected = "does not carry the identity")]
    fn test_change_with_new_identity_panics() {
        DiffReconciler::default().apply(&list("ABC"), &ChangeDelta::new().changing(1, 'Q'));
    }

    #[test]
    #[should_panic(expected = "move (0, 5) out of range")]
    fn test_move_out_of_range_panics() {
        DiffReconciler::default().apply(&list("ABC"), &ChangeDelta::new().moving(0, 5));
    }

    #[test]
    fn test_strategy_json_names() {
        let json = serde_json::to_string(&ReconcileStrategy::LEGACY_ITEMS).unwrap();
        assert_eq!(json, r#"{"moves":"anchor_exchange","changes":"in_place"}"#);

        let parsed: ReconcileStrategy = serde_json::from_str(r#"{"moves":"swap"}"#).unwrap();
        assert_eq!(parsed.moves, MoveStrategy::Swap);
        assert_eq!(parsed.changes, ChangeStrategy::InPlace);
    }
}
