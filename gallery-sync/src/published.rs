//! Observable engine state.
//!
//! Three latest-value cells plus an edit feed:
//!
//! ```text
//!                         ┌─► content      (Arc<ContentState>)      ─► Subscription
//! ChangeSerializer ──────►├─► collections  (Arc<CollectionsIndex>)  ─► Subscription
//!   (single writer)       ├─► selection    (Option<SourceSelector>) ─► Subscription
//!                         └─► edit feed    (broadcast, every state) ─► Receiver
//! ```
//!
//! A [`Subscription`] yields the current value first, then the most recent
//! value each time it is polled after a change. Intermediate values may be
//! skipped; the edit feed is the lossless alternative, bounded by its
//! capacity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gallery_core::{CollectionsIndex, EditScript, Item, Snapshot, SourceSelector};
use tokio::sync::{broadcast, watch};

/// Why a content state was published.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentChange {
    /// Engine created, nothing loaded yet.
    Initial,
    /// Full fetch after a source switch or a recovery.
    Reload,
    /// Incremental update of the same source.
    Edits(EditScript<Item>),
}

impl ContentChange {
    pub fn is_reload(&self) -> bool {
        matches!(self, ContentChange::Reload)
    }

    pub fn edits(&self) -> Option<&EditScript<Item>> {
        match self {
            ContentChange::Edits(edits) => Some(edits),
            _ => None,
        }
    }
}

/// One published version of the item grid.
#[derive(Debug, Clone)]
pub struct ContentState {
    /// Increases by one with every publish.
    pub revision: u64,
    /// Source epoch the snapshot was loaded under.
    pub epoch: u64,
    /// Source the snapshot was loaded for.
    pub selector: Option<SourceSelector>,
    pub snapshot: Arc<Snapshot>,
    pub change: ContentChange,
}

impl ContentState {
    fn initial() -> Self {
        Self {
            revision: 0,
            epoch: 0,
            selector: None,
            snapshot: Arc::new(Snapshot::new()),
            change: ContentChange::Initial,
        }
    }
}

/// Single-writer cell holding the latest value.
pub struct LatestCell<T> {
    sender: Arc<watch::Sender<T>>,
}

impl<T> Clone for LatestCell<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T: Clone> LatestCell<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub(crate) fn publish(&self, value: T) {
        self.sender.send_replace(value);
    }

    pub fn current(&self) -> T {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            receiver: self.sender.subscribe(),
            primed: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Replay-latest reader of a [`LatestCell`].
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    /// Current value on the first call, then the latest value after each change.
    ///
    /// Returns `None` once every writer is gone.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Latest value without waiting; marks it seen.
    pub fn latest(&mut self) -> T {
        self.primed = true;
        self.receiver.borrow_and_update().clone()
    }

    /// Whether a value newer than the last one returned is available.
    pub fn has_changed(&self) -> bool {
        !self.primed || self.receiver.has_changed().unwrap_or(false)
    }
}

/// Publish counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub content_updates: u64,
    pub collections_updates: u64,
    pub selection_updates: u64,
    pub edit_feed_receivers: usize,
}

struct AtomicPublishStats {
    content_updates: AtomicU64,
    collections_updates: AtomicU64,
    selection_updates: AtomicU64,
}

impl AtomicPublishStats {
    fn new() -> Self {
        Self {
            content_updates: AtomicU64::new(0),
            collections_updates: AtomicU64::new(0),
            selection_updates: AtomicU64::new(0),
        }
    }
}

/// Everything the engine exposes to its consumers.
#[derive(Clone)]
pub struct PublishedState {
    content: LatestCell<Arc<ContentState>>,
    collections: LatestCell<Arc<CollectionsIndex>>,
    selection: LatestCell<Option<SourceSelector>>,
    edits: broadcast::Sender<Arc<ContentState>>,
    stats: Arc<AtomicPublishStats>,
}

impl PublishedState {
    /// `edit_feed_capacity` states are buffered per edit-feed receiver.
    pub fn new(edit_feed_capacity: usize) -> Self {
        let (edits, _) = broadcast::channel(edit_feed_capacity.max(1));
        Self {
            content: LatestCell::new(Arc::new(ContentState::initial())),
            collections: LatestCell::new(Arc::new(CollectionsIndex::new())),
            selection: LatestCell::new(None),
            edits,
            stats: Arc::new(AtomicPublishStats::new()),
        }
    }

    pub fn content(&self) -> Arc<ContentState> {
        self.content.current()
    }

    pub fn collections(&self) -> Arc<CollectionsIndex> {
        self.collections.current()
    }

    /// Selected source, published right after the matching content state.
    ///
    /// To know which source a snapshot belongs to, read
    /// [`ContentState::selector`] instead.
    pub fn selection(&self) -> Option<SourceSelector> {
        self.selection.current()
    }

    pub fn subscribe_content(&self) -> Subscription<Arc<ContentState>> {
        self.content.subscribe()
    }

    pub fn subscribe_collections(&self) -> Subscription<Arc<CollectionsIndex>> {
        self.collections.subscribe()
    }

    pub fn subscribe_selection(&self) -> Subscription<Option<SourceSelector>> {
        self.selection.subscribe()
    }

    /// Every content state published after this call, in order.
    pub fn subscribe_edits(&self) -> broadcast::Receiver<Arc<ContentState>> {
        self.edits.subscribe()
    }

    pub fn stats(&self) -> PublishStats {
        PublishStats {
            content_updates: self.stats.content_updates.load(Ordering::Relaxed),
            collections_updates: self.stats.collections_updates.load(Ordering::Relaxed),
            selection_updates: self.stats.selection_updates.load(Ordering::Relaxed),
            edit_feed_receivers: self.edits.receiver_count(),
        }
    }

    /// Publish the next content state; the revision is assigned here.
    pub(crate) fn publish_content(
        &self,
        epoch: u64,
        selector: Option<SourceSelector>,
        snapshot: Arc<Snapshot>,
        change: ContentChange,
    ) -> Arc<ContentState> {
        let state = Arc::new(ContentState {
            revision: self.content.current().revision + 1,
            epoch,
            selector,
            snapshot,
            change,
        });
        self.content.publish(Arc::clone(&state));
        // No receivers is fine
        let _ = self.edits.send(Arc::clone(&state));
        self.stats.content_updates.fetch_add(1, Ordering::Relaxed);
        state
    }

    pub(crate) fn publish_collections(&self, index: Arc<CollectionsIndex>) {
        self.collections.publish(index);
        self.stats.collections_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn publish_selection(&self, selector: Option<SourceSelector>) {
        self.selection.publish(selector);
        self.stats.selection_updates.fetch_add(1, Ordering::Relaxed);
    }
}
