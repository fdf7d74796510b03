//! # gallery-core — Ordered-collection reconciliation for the gallery browser
//!
//! Pure, synchronous building blocks for keeping an identity-stable item grid
//! and the album menu in step with a change feed that reports *deltas*, not
//! snapshots.
//!
//! ## Architecture
//!
//! ```text
//!   ChangeDelta<Item>                 ChangeDelta<GroupObject> (per kind)
//!          │                                     │
//!          ▼                                     ▼
//! ┌─────────────────┐                 ┌─────────────────────────┐
//! │ DiffReconciler  │ ◄────────────── │ GroupsIndexSynchronizer │
//! │ remove → insert │    same core    │ Smart list │ Regular list│
//! │ → change → move │                 └────────────┬────────────┘
//! └────────┬────────┘                              │
//!          │ (list, EditScript)                    ▼
//!          ▼                               CollectionsIndex
//!      Snapshot
//! ```
//!
//! ## Modules
//!
//! - [`model`] — Item / Section / Snapshot value types
//! - [`delta`] — `ChangeDelta`, the change feed's description of one change
//! - [`edit`] — `Edit` / `EditScript`, replayable positional edits
//! - [`reconcile`] — `DiffReconciler` and its move/change strategies
//! - [`groups`] — `GroupObject`, `CollectionsIndex`, `GroupsIndexSynchronizer`

pub mod model;
pub mod delta;
pub mod edit;
pub mod reconcile;
pub mod groups;

// Re-exports for convenience
pub use model::{Item, ItemId, SectionId, Snapshot, SnapshotError, SourceSelector};
pub use delta::ChangeDelta;
pub use edit::{Edit, EditScript};
pub use reconcile::{
    ChangeStrategy, DiffReconciler, Identified, MoveStrategy, ReconcileStrategy, Reconciled,
};
pub use groups::{
    CollectionsIndex, GroupId, GroupKind, GroupObject, GroupsIndexSynchronizer,
};
