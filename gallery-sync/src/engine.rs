//! Public handle of a running engine.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gallery_core::SourceSelector;
use tokio::sync::{mpsc, oneshot};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::provider::{AuthorizationStatus, Authorizer, ChangeFeed, GroupProvider, SourceProvider};
use crate::published::PublishedState;
use crate::serializer::{ChangeSerializer, Command};

/// Cloneable handle to the change serializer task.
///
/// The task stops on [`Engine::shutdown`] or when the last handle is dropped.
pub struct Engine<E> {
    commands: mpsc::UnboundedSender<Command<E>>,
    published: PublishedState,
    config: Arc<EngineConfig>,
    denied: Arc<AtomicBool>,
}

impl<E> Clone for Engine<E> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            published: self.published.clone(),
            config: Arc::clone(&self.config),
            denied: Arc::clone(&self.denied),
        }
    }
}

impl<E> fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("running", &!self.commands.is_closed())
            .field("denied", &self.denied.load(Ordering::Acquire))
            .field("config", &self.config)
            .finish()
    }
}

impl<E> Engine<E>
where
    E: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Start the serializer task on the current tokio runtime.
    ///
    /// Nothing is fetched until [`Engine::load`].
    pub fn spawn<S, G, F>(config: EngineConfig, source: Arc<S>, groups: Arc<G>, feed: Arc<F>) -> Self
    where
        S: SourceProvider<Event = E>,
        G: GroupProvider<Event = E>,
        F: ChangeFeed<E>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let published = PublishedState::new(config.edit_feed_capacity);
        let serializer = ChangeSerializer::new(
            &config,
            source,
            groups,
            feed,
            published.clone(),
            tx.downgrade(),
            rx,
        );
        tokio::spawn(serializer.run());

        Self {
            commands: tx,
            published,
            config: Arc::new(config),
            denied: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Authorize, then fetch both group lists and the full library.
    ///
    /// Resolves after the first snapshot and the collections index are
    /// published. Calling it again refetches everything and keeps the
    /// current selection.
    pub async fn load<A: Authorizer>(&self, authorizer: &A) -> Result<(), EngineError> {
        self.authorize(authorizer).await?;
        let (reply, done) = oneshot::channel();
        self.send(Command::Load { reply })?;
        done.await.map_err(|_| EngineError::Stopped)
    }

    /// Switch the item grid to `selector`.
    ///
    /// Resolves once the new snapshot is published. Change events from the
    /// previous source that are still queued are discarded.
    pub async fn select(&self, selector: SourceSelector) -> Result<(), EngineError> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Select { selector, reply })?;
        done.await.map_err(|_| EngineError::Stopped)?
    }

    /// Wait until every change event queued so far has been processed.
    pub async fn flush(&self) -> Result<(), EngineError> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Flush { reply })?;
        done.await.map_err(|_| EngineError::Stopped)
    }

    /// Unregister every observer and stop the task.
    ///
    /// Commands queued behind the shutdown fail with [`EngineError::Stopped`].
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Shutdown { reply })?;
        done.await.map_err(|_| EngineError::Stopped)
    }

    pub fn published(&self) -> &PublishedState {
        &self.published
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Whether access was denied; a denied engine never loads again.
    pub fn is_denied(&self) -> bool {
        self.denied.load(Ordering::Acquire)
    }

    async fn authorize<A: Authorizer>(&self, authorizer: &A) -> Result<(), EngineError> {
        if self.is_denied() {
            return Err(EngineError::AuthorizationDenied);
        }

        let prompts = self.config.max_authorization_prompts.max(1);
        for prompt in 1..=prompts {
            match authorizer.request_authorization().await {
                AuthorizationStatus::Authorized => return Ok(()),
                AuthorizationStatus::Denied => {
                    self.denied.store(true, Ordering::Release);
                    log::warn!("Photo library access denied");
                    return Err(EngineError::AuthorizationDenied);
                }
                AuthorizationStatus::PendingRetry => {
                    log::warn!("Photo library access pending (prompt {prompt}/{prompts})");
                }
            }
        }
        Err(EngineError::AuthorizationPending(prompts))
    }

    fn send(&self, command: Command<E>) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::Stopped)
    }
}
