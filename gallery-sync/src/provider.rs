//! Interfaces of the external collaborators.
//!
//! The engine never talks to the platform photo library directly. It asks a
//! [`SourceProvider`] for the item grid, a [`GroupProvider`] for the album
//! menu, an [`Authorizer`] for access, and a [`ChangeFeed`] for notifications.
//!
//! A *handle* is the provider's reference to "the source as of a point in
//! time". Deltas are always requested relative to the last handle the engine
//! holds, and every resolved delta comes with the handle to use next.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use gallery_core::{ChangeDelta, GroupKind, GroupObject, Item};

/// Result of a full fetch.
#[derive(Debug, Clone)]
pub struct Fetched<H, T> {
    pub handle: H,
    pub items: Vec<T>,
}

/// A change event resolved against a handle.
#[derive(Debug, Clone)]
pub struct Resolved<H, T> {
    /// Handle after the change
    pub handle: H,
    pub delta: ChangeDelta<T>,
}

/// Backing source of the item grid.
pub trait SourceProvider: Send + Sync + 'static {
    type Handle: Clone + fmt::Debug + Send + Sync + 'static;
    type Event: Clone + fmt::Debug + Send + Sync + 'static;

    /// Every item of the library, in display order.
    fn fetch_all(&self) -> impl Future<Output = Fetched<Self::Handle, Item>> + Send;

    /// Items of one group, in display order.
    fn fetch_filtered(
        &self,
        group: &GroupObject,
    ) -> impl Future<Output = Fetched<Self::Handle, Item>> + Send;

    /// Delta of `event` relative to `previous`; `None` when the event does not
    /// concern that handle.
    fn change_delta(
        &self,
        previous: &Self::Handle,
        event: &Self::Event,
    ) -> impl Future<Output = Option<Resolved<Self::Handle, Item>>> + Send;
}

/// Backing source of the album menu.
pub trait GroupProvider: Send + Sync + 'static {
    type Handle: Clone + fmt::Debug + Send + Sync + 'static;
    type Event: Clone + fmt::Debug + Send + Sync + 'static;

    fn list_groups(
        &self,
        kind: GroupKind,
    ) -> impl Future<Output = Fetched<Self::Handle, GroupObject>> + Send;

    fn change_delta(
        &self,
        previous: &Self::Handle,
        event: &Self::Event,
    ) -> impl Future<Output = Option<Resolved<Self::Handle, GroupObject>>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    /// Not decided yet; ask again.
    PendingRetry,
}

pub trait Authorizer: Send + Sync {
    fn request_authorization(&self) -> impl Future<Output = AuthorizationStatus> + Send;
}

/// Capability invoked by the change feed for every library change.
pub trait ChangeObserver<E>: Send + Sync {
    fn on_change(&self, event: E);
}

/// Registration handed out by a [`ChangeFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

impl ObserverToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Source of change notifications.
///
/// Observers may be invoked from any thread, at any time, until unregistered.
pub trait ChangeFeed<E>: Send + Sync + 'static {
    fn register(&self, observer: Arc<dyn ChangeObserver<E>>) -> ObserverToken;
    fn unregister(&self, token: ObserverToken);
}
