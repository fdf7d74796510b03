//! The active item source and its epoch.
//!
//! Every selection opens a new epoch: the previous observer is unregistered,
//! a fresh observer tagged with the new epoch is registered, and a full fetch
//! replaces the snapshot. Change events tagged with any other epoch are stale
//! and dropped.

use std::sync::Arc;

use gallery_core::{
    CollectionsIndex, DiffReconciler, Item, SectionId, Snapshot, SourceSelector,
};
use tokio::sync::mpsc::WeakUnboundedSender;

use crate::provider::{ChangeFeed, ObserverToken, SourceProvider};
use crate::published::{ContentChange, PublishedState};
use crate::serializer::{Command, ForwardingObserver, Route};

struct ActiveSource<H> {
    selector: SourceSelector,
    handle: H,
    epoch: u64,
    token: ObserverToken,
}

pub(crate) struct SourceController<S: SourceProvider, F> {
    provider: Arc<S>,
    feed: Arc<F>,
    commands: WeakUnboundedSender<Command<S::Event>>,
    section: SectionId,
    reconciler: DiffReconciler,
    active: Option<ActiveSource<S::Handle>>,
    epoch: u64,
    snapshot: Arc<Snapshot>,
}

impl<S, F> SourceController<S, F>
where
    S: SourceProvider,
    F: ChangeFeed<S::Event>,
{
    pub(crate) fn new(
        provider: Arc<S>,
        feed: Arc<F>,
        commands: WeakUnboundedSender<Command<S::Event>>,
        section: SectionId,
        reconciler: DiffReconciler,
    ) -> Self {
        Self {
            provider,
            feed,
            commands,
            section,
            reconciler,
            active: None,
            epoch: 0,
            snapshot: Arc::new(Snapshot::new()),
        }
    }

    pub(crate) fn selector(&self) -> Option<&SourceSelector> {
        self.active.as_ref().map(|active| &active.selector)
    }

    /// Switch to `selector`: new epoch, new observer, full fetch, publish.
    ///
    /// The content state is published first and carries `selector`; the
    /// selection cell follows. A reader that polls both cells in between sees
    /// the new content next to the old selection, so `ContentState::selector`
    /// is the one to pair with a snapshot.
    pub(crate) async fn select(&mut self, selector: SourceSelector, published: &PublishedState) {
        self.detach();

        self.epoch += 1;
        let epoch = self.epoch;
        let observer = ForwardingObserver::new(Route::Content { epoch }, self.commands.clone());
        let token = self.feed.register(Arc::new(observer));

        let fetched = match &selector {
            SourceSelector::AllItems => self.provider.fetch_all().await,
            SourceSelector::FilteredByGroup(group) => self.provider.fetch_filtered(group).await,
        };

        self.snapshot = Arc::new(self.full_snapshot(fetched.items));
        log::info!(
            "Source switched to {selector} ({} items, epoch {epoch})",
            self.snapshot.len()
        );

        self.active = Some(ActiveSource {
            selector: selector.clone(),
            handle: fetched.handle,
            epoch,
            token,
        });
        published.publish_content(
            epoch,
            Some(selector.clone()),
            Arc::clone(&self.snapshot),
            ContentChange::Reload,
        );
        published.publish_selection(Some(selector));
    }

    /// Resolve and apply one change event routed to `epoch`.
    pub(crate) async fn handle_change(
        &mut self,
        epoch: u64,
        event: S::Event,
        published: &PublishedState,
    ) {
        let Some(active) = self.active.as_mut() else {
            log::debug!("Change event for epoch {epoch} before any source was selected");
            return;
        };
        if active.epoch != epoch {
            log::debug!(
                "Discarding stale change event for epoch {epoch} (active epoch {})",
                active.epoch
            );
            return;
        }

        let Some(resolved) = self.provider.change_delta(&active.handle, &event).await else {
            log::trace!("Change event does not concern {}", active.selector);
            return;
        };
        active.handle = resolved.handle;
        if !resolved.delta.has_changes() {
            return;
        }

        let outcome = self
            .snapshot
            .reconciled(&self.section, &resolved.delta, &self.reconciler);
        match outcome {
            Ok((next, edits)) => {
                log::debug!(
                    "{}: {} edits, {} items",
                    active.selector,
                    edits.len(),
                    next.len()
                );
                self.snapshot = Arc::new(next);
                published.publish_content(
                    epoch,
                    Some(active.selector.clone()),
                    Arc::clone(&self.snapshot),
                    ContentChange::Edits(edits),
                );
            }
            Err(e) => {
                let selector = active.selector.clone();
                log::error!("Snapshot rejected change for {selector}: {e}; reloading");
                self.select(selector, published).await;
            }
        }
    }

    /// Pick up a new title for the selected group after an album-menu change.
    pub(crate) fn refresh_selected(&mut self, index: &CollectionsIndex, published: &PublishedState) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let SourceSelector::FilteredByGroup(group) = &active.selector else {
            return;
        };
        let Some(updated) = index.find(group.id) else {
            log::debug!("Selected group {} is no longer listed", group.title);
            return;
        };
        if updated == group {
            return;
        }

        log::info!("Selected group renamed to \"{}\"", updated.title);
        active.selector = SourceSelector::FilteredByGroup(updated.clone());
        published.publish_selection(Some(active.selector.clone()));
    }

    /// Unregister the active observer, if any.
    pub(crate) fn detach(&mut self) {
        if let Some(active) = self.active.take() {
            self.feed.unregister(active.token);
            log::debug!("Unregistered observer for epoch {}", active.epoch);
        }
    }

    /// Build a one-section snapshot, keeping the first occurrence of a
    /// duplicated identity.
    fn full_snapshot(&self, items: Vec<Item>) -> Snapshot {
        let mut snapshot = Snapshot::new();
        if let Err(e) = snapshot.append_section(self.section.clone()) {
            log::error!("{e}");
        }
        for item in items {
            if let Err(e) = snapshot.append_items(&self.section, [item]) {
                log::warn!("Skipping fetched item: {e}");
            }
        }
        snapshot
    }
}
