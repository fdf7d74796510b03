//! Album menu state held by the serializer.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join;
use gallery_core::{CollectionsIndex, GroupKind, GroupsIndexSynchronizer};
use tokio::sync::mpsc::WeakUnboundedSender;

use crate::provider::{ChangeFeed, GroupProvider, ObserverToken};
use crate::published::PublishedState;
use crate::serializer::{Command, ForwardingObserver, Route};

pub(crate) struct CollectionsController<G: GroupProvider, F> {
    provider: Arc<G>,
    feed: Arc<F>,
    commands: WeakUnboundedSender<Command<G::Event>>,
    synchronizer: GroupsIndexSynchronizer,
    handles: BTreeMap<GroupKind, G::Handle>,
    index: Arc<CollectionsIndex>,
    token: Option<ObserverToken>,
}

impl<G, F> CollectionsController<G, F>
where
    G: GroupProvider,
    F: ChangeFeed<G::Event>,
{
    pub(crate) fn new(
        provider: Arc<G>,
        feed: Arc<F>,
        commands: WeakUnboundedSender<Command<G::Event>>,
        synchronizer: GroupsIndexSynchronizer,
    ) -> Self {
        Self {
            provider,
            feed,
            commands,
            synchronizer,
            handles: BTreeMap::new(),
            index: Arc::new(CollectionsIndex::new()),
            token: None,
        }
    }

    /// Fetch both group lists and publish the index.
    pub(crate) async fn load(&mut self, published: &PublishedState) {
        if self.token.is_none() {
            let observer = ForwardingObserver::new(Route::Groups, self.commands.clone());
            self.token = Some(self.feed.register(Arc::new(observer)));
        }

        let (smart, regular) = join(
            self.provider.list_groups(GroupKind::Smart),
            self.provider.list_groups(GroupKind::Regular),
        )
        .await;

        self.handles.insert(GroupKind::Smart, smart.handle);
        self.handles.insert(GroupKind::Regular, regular.handle);
        let index = CollectionsIndex::from_lists([
            (GroupKind::Smart, smart.items),
            (GroupKind::Regular, regular.items),
        ]);
        log::info!("Loaded {} groups", index.len());

        self.index = Arc::new(index);
        published.publish_collections(Arc::clone(&self.index));
    }

    /// Resolve one change event against both kinds.
    ///
    /// Returns the new index when it was published.
    pub(crate) async fn handle_change(
        &mut self,
        event: &G::Event,
        published: &PublishedState,
    ) -> Option<Arc<CollectionsIndex>> {
        let mut deltas = BTreeMap::new();
        for kind in GroupKind::ALL {
            let Some(handle) = self.handles.get(&kind) else {
                continue;
            };
            if let Some(resolved) = self.provider.change_delta(handle, event).await {
                self.handles.insert(kind, resolved.handle);
                deltas.insert(kind, resolved.delta);
            }
        }

        let next = self.synchronizer.apply(&self.index, &deltas)?;
        self.index = Arc::new(next);
        published.publish_collections(Arc::clone(&self.index));
        Some(Arc::clone(&self.index))
    }

    pub(crate) fn detach(&mut self) {
        if let Some(token) = self.token.take() {
            self.feed.unregister(token);
        }
    }
}
