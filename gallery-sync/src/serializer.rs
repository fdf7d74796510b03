//! The single task that owns all mutable engine state.
//!
//! Change notifications arrive on arbitrary threads. Observers never touch
//! state; they forward the event into one unbounded queue, tagged with the
//! route it belongs to. One task drains the queue in arrival order, so
//! resolving, reconciling and publishing never interleave.
//!
//! ```text
//! feed thread ──► ForwardingObserver ──┐
//! feed thread ──► ForwardingObserver ──┼──► mpsc (unbounded, FIFO) ──► ChangeSerializer::run
//! Engine::{load, select, flush, ...} ──┘                                  ├──► SourceController
//!                                                                         └──► CollectionsController
//! ```
//!
//! Observers hold a weak sender: once every `Engine` handle is dropped the
//! queue closes and the task tears down.

use std::sync::Arc;

use gallery_core::{DiffReconciler, GroupsIndexSynchronizer, SourceSelector};
use tokio::sync::mpsc::{UnboundedReceiver, WeakUnboundedSender};
use tokio::sync::oneshot;

use crate::collections::CollectionsController;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::provider::{ChangeFeed, ChangeObserver, GroupProvider, SourceProvider};
use crate::published::PublishedState;
use crate::source::SourceController;

/// Destination of a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    /// Item grid, valid only while `epoch` is the active one.
    Content { epoch: u64 },
    Groups,
}

pub(crate) enum Command<E> {
    Load {
        reply: oneshot::Sender<()>,
    },
    Select {
        selector: SourceSelector,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Change {
        route: Route,
        event: E,
    },
    /// Completes once every command queued before it was processed.
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Observer registered with the change feed.
pub(crate) struct ForwardingObserver<E> {
    route: Route,
    commands: WeakUnboundedSender<Command<E>>,
}

impl<E> ForwardingObserver<E> {
    pub(crate) fn new(route: Route, commands: WeakUnboundedSender<Command<E>>) -> Self {
        Self { route, commands }
    }
}

impl<E: Send + Sync> ChangeObserver<E> for ForwardingObserver<E> {
    fn on_change(&self, event: E) {
        let Some(commands) = self.commands.upgrade() else {
            log::debug!("Change event after engine stopped ({:?})", self.route);
            return;
        };
        let command = Command::Change {
            route: self.route,
            event,
        };
        if commands.send(command).is_err() {
            log::debug!("Change event after engine stopped ({:?})", self.route);
        }
    }
}

pub(crate) struct ChangeSerializer<S, G, F>
where
    S: SourceProvider,
    G: GroupProvider<Event = S::Event>,
    F: ChangeFeed<S::Event>,
{
    source: SourceController<S, F>,
    collections: CollectionsController<G, F>,
    published: PublishedState,
    commands: UnboundedReceiver<Command<S::Event>>,
    loaded: bool,
}

impl<S, G, F> ChangeSerializer<S, G, F>
where
    S: SourceProvider,
    G: GroupProvider<Event = S::Event>,
    F: ChangeFeed<S::Event>,
{
    pub(crate) fn new(
        config: &EngineConfig,
        source: Arc<S>,
        groups: Arc<G>,
        feed: Arc<F>,
        published: PublishedState,
        sender: WeakUnboundedSender<Command<S::Event>>,
        commands: UnboundedReceiver<Command<S::Event>>,
    ) -> Self {
        Self {
            source: SourceController::new(
                source,
                Arc::clone(&feed),
                sender.clone(),
                config.section.clone(),
                DiffReconciler::new(config.item_strategy),
            ),
            collections: CollectionsController::new(
                groups,
                feed,
                sender,
                GroupsIndexSynchronizer::new(config.group_strategy),
            ),
            published,
            commands,
            loaded: false,
        }
    }

    /// Drain the queue until shutdown or until every sender is gone.
    pub(crate) async fn run(mut self) {
        log::debug!("Change serializer started");

        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Load { reply } => {
                    self.load().await;
                    let _ = reply.send(());
                }
                Command::Select { selector, reply } => {
                    let result = if self.loaded {
                        self.source.select(selector, &self.published).await;
                        Ok(())
                    } else {
                        Err(EngineError::NotLoaded)
                    };
                    let _ = reply.send(result);
                }
                Command::Change {
                    route: Route::Content { epoch },
                    event,
                } => {
                    self.source
                        .handle_change(epoch, event, &self.published)
                        .await;
                }
                Command::Change {
                    route: Route::Groups,
                    event,
                } => {
                    if let Some(index) = self
                        .collections
                        .handle_change(&event, &self.published)
                        .await
                    {
                        self.source.refresh_selected(&index, &self.published);
                    }
                }
                Command::Flush { reply } => {
                    let _ = reply.send(());
                }
                Command::Shutdown { reply } => {
                    self.teardown();
                    let _ = reply.send(());
                    return;
                }
            }
        }

        self.teardown();
    }

    /// Initial load: group lists, then the full library.
    ///
    /// Reloading keeps the current selection.
    async fn load(&mut self) {
        self.collections.load(&self.published).await;
        let selector = self
            .source
            .selector()
            .cloned()
            .unwrap_or(SourceSelector::AllItems);
        self.source.select(selector, &self.published).await;
        self.loaded = true;
    }

    fn teardown(&mut self) {
        self.source.detach();
        self.collections.detach();
        self.commands.close();
        log::info!("Change serializer stopped");
    }
}

/// Observers are unregistered even when the task unwinds.
impl<S, G, F> Drop for ChangeSerializer<S, G, F>
where
    S: SourceProvider,
    G: GroupProvider<Event = S::Event>,
    F: ChangeFeed<S::Event>,
{
    fn drop(&mut self) {
        self.source.detach();
        self.collections.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_observer_tags_events_with_route() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command<u32>>();
        let observer = ForwardingObserver::new(Route::Content { epoch: 4 }, tx.downgrade());

        observer.on_change(7);
        match rx.recv().await {
            Some(Command::Change { route, event }) => {
                assert_eq!(route, Route::Content { epoch: 4 });
                assert_eq!(event, 7);
            }
            _ => panic!("expected a change command"),
        }
    }

    #[tokio::test]
    async fn test_observer_does_not_keep_queue_open() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command<u32>>();
        let observer = ForwardingObserver::new(Route::Groups, tx.downgrade());
        drop(tx);

        observer.on_change(1);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_events_keep_arrival_order_across_threads() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command<u32>>();
        let observer = std::sync::Arc::new(ForwardingObserver::new(Route::Groups, tx.downgrade()));

        let remote = std::sync::Arc::clone(&observer);
        std::thread::spawn(move || {
            for n in 0..100 {
                remote.on_change(n);
            }
        })
        .join()
        .unwrap();

        let mut seen = Vec::new();
        while let Ok(Command::Change { event, .. }) = rx.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
        drop(tx);
    }
}
