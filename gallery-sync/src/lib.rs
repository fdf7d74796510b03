//! # gallery-sync — Change-serializing engine for the gallery browser
//!
//! Keeps the item grid and the album menu of a photo-library browser in step
//! with an asynchronous change feed, and publishes both as observable state.
//!
//! ## Architecture
//!
//! ```text
//! ChangeFeed ──on_change──► ForwardingObserver (route, epoch, weak sender)
//!                                  │
//! Engine::load/select/flush ──────►│ mpsc (unbounded, FIFO)
//!                                  ▼
//!                         ┌──────────────────┐
//!                         │ ChangeSerializer │ sole writer
//!                         └──┬────────────┬──┘
//!                            ▼            ▼
//!               SourceController    CollectionsController
//!               (SourceProvider)    (GroupProvider)
//!                            │            │
//!                            ▼            ▼
//!                         ┌──────────────────┐
//!                         │  PublishedState  │ ──► Subscription / edit feed
//!                         └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] — `Engine`, the cloneable handle
//! - [`provider`] — collaborator traits (sources, groups, authorization, feed)
//! - [`published`] — latest-value cells and the edit feed
//! - [`config`] — `EngineConfig`
//! - [`error`] — `EngineError`

pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod published;

mod collections;
mod serializer;
mod source;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use provider::{
    AuthorizationStatus, Authorizer, ChangeFeed, ChangeObserver, Fetched, GroupProvider,
    ObserverToken, Resolved, SourceProvider,
};
pub use published::{
    ContentChange, ContentState, LatestCell, PublishStats, PublishedState, Subscription,
};
