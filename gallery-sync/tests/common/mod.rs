//! Scripted photo library shared by the integration tests.
//!
//! `ScriptedLibrary` serves stored lists and answers change events with the
//! deltas the event carries for the asked-about source. `ScriptedFeed` keeps
//! every observer ever registered so tests can deliver events late.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gallery_core::{ChangeDelta, DiffReconciler, GroupId, GroupKind, GroupObject, Item, SectionId};
use gallery_sync::{
    AuthorizationStatus, Authorizer, ChangeFeed, ChangeObserver, ContentState, Engine,
    EngineConfig, Fetched, GroupProvider, ObserverToken, Resolved, SourceProvider,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKey {
    All,
    Group(GroupId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub key: SourceKey,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    pub kind: GroupKind,
    pub version: u64,
}

/// One library change, as seen by every source it touches.
#[derive(Debug, Clone, Default)]
pub struct LibraryEvent {
    pub items: Vec<(SourceKey, ChangeDelta<Item>)>,
    pub groups: Vec<(GroupKind, ChangeDelta<GroupObject>)>,
}

impl LibraryEvent {
    pub fn items(key: SourceKey, delta: ChangeDelta<Item>) -> Self {
        Self {
            items: vec![(key, delta)],
            groups: Vec::new(),
        }
    }

    pub fn groups(kind: GroupKind, delta: ChangeDelta<GroupObject>) -> Self {
        Self {
            items: Vec::new(),
            groups: vec![(kind, delta)],
        }
    }

    pub fn and_items(mut self, key: SourceKey, delta: ChangeDelta<Item>) -> Self {
        self.items.push((key, delta));
        self
    }
}

#[derive(Default)]
pub struct ScriptedLibrary {
    items: Mutex<HashMap<SourceKey, Vec<Item>>>,
    groups: Mutex<BTreeMap<GroupKind, Vec<GroupObject>>>,
    fetches: AtomicUsize,
}

impl ScriptedLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(self, key: SourceKey, items: Vec<Item>) -> Self {
        self.items.lock().unwrap().insert(key, items);
        self
    }

    pub fn with_groups(self, kind: GroupKind, groups: Vec<GroupObject>) -> Self {
        self.groups.lock().unwrap().insert(kind, groups);
        self
    }

    pub fn stored_items(&self, key: SourceKey) -> Vec<Item> {
        self.items.lock().unwrap().get(&key).cloned().unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Apply `event` to the stored lists, then deliver it through `feed`.
    pub fn commit(&self, feed: &ScriptedFeed, event: LibraryEvent) {
        let reconciler = DiffReconciler::default();
        {
            let mut items = self.items.lock().unwrap();
            for (key, delta) in &event.items {
                let list = items.entry(*key).or_default();
                *list = reconciler.apply(list.as_slice(), delta).list;
            }
            let mut groups = self.groups.lock().unwrap();
            for (kind, delta) in &event.groups {
                let list = groups.entry(*kind).or_default();
                *list = reconciler.apply(list.as_slice(), delta).list;
            }
        }
        feed.emit(event);
    }

    fn fetch(&self, key: SourceKey) -> Fetched<Handle, Item> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Fetched {
            handle: Handle { key, version: 0 },
            items: self.stored_items(key),
        }
    }
}

impl SourceProvider for ScriptedLibrary {
    type Handle = Handle;
    type Event = LibraryEvent;

    async fn fetch_all(&self) -> Fetched<Handle, Item> {
        self.fetch(SourceKey::All)
    }

    async fn fetch_filtered(&self, group: &GroupObject) -> Fetched<Handle, Item> {
        self.fetch(SourceKey::Group(group.id))
    }

    async fn change_delta(
        &self,
        previous: &Handle,
        event: &LibraryEvent,
    ) -> Option<Resolved<Handle, Item>> {
        let (_, delta) = event.items.iter().find(|(key, _)| *key == previous.key)?;
        Some(Resolved {
            handle: Handle {
                key: previous.key,
                version: previous.version + 1,
            },
            delta: delta.clone(),
        })
    }
}

impl GroupProvider for ScriptedLibrary {
    type Handle = GroupHandle;
    type Event = LibraryEvent;

    async fn list_groups(&self, kind: GroupKind) -> Fetched<GroupHandle, GroupObject> {
        Fetched {
            handle: GroupHandle { kind, version: 0 },
            items: self.groups.lock().unwrap().get(&kind).cloned().unwrap_or_default(),
        }
    }

    async fn change_delta(
        &self,
        previous: &GroupHandle,
        event: &LibraryEvent,
    ) -> Option<Resolved<GroupHandle, GroupObject>> {
        let (_, delta) = event.groups.iter().find(|(kind, _)| *kind == previous.kind)?;
        Some(Resolved {
            handle: GroupHandle {
                kind: previous.kind,
                version: previous.version + 1,
            },
            delta: delta.clone(),
        })
    }
}

type Observer = Arc<dyn ChangeObserver<LibraryEvent>>;

#[derive(Default)]
pub struct ScriptedFeed {
    next_token: AtomicU64,
    active: Mutex<Vec<(ObserverToken, Observer)>>,
    history: Mutex<Vec<Observer>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every registered observer.
    pub fn emit(&self, event: LibraryEvent) {
        let observers: Vec<Observer> = self
            .active
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.on_change(event.clone());
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn registered_count(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    /// The `n`-th observer ever registered, still callable after unregistering.
    pub fn registered(&self, n: usize) -> Observer {
        Arc::clone(&self.history.lock().unwrap()[n])
    }
}

impl ChangeFeed<LibraryEvent> for ScriptedFeed {
    fn register(&self, observer: Observer) -> ObserverToken {
        let token = ObserverToken::new(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.history.lock().unwrap().push(Arc::clone(&observer));
        self.active.lock().unwrap().push((token, observer));
        token
    }

    fn unregister(&self, token: ObserverToken) {
        self.active.lock().unwrap().retain(|(t, _)| *t != token);
    }
}

/// Answers prompts from a script; the last answer repeats.
pub struct ScriptedAuthorizer {
    answers: Mutex<VecDeque<AuthorizationStatus>>,
    prompts: AtomicUsize,
}

impl ScriptedAuthorizer {
    pub fn new(answers: impl IntoIterator<Item = AuthorizationStatus>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new([AuthorizationStatus::Authorized])
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Authorizer for ScriptedAuthorizer {
    async fn request_authorization(&self) -> AuthorizationStatus {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front().unwrap()
        } else {
            answers.front().copied().unwrap_or(AuthorizationStatus::Denied)
        }
    }
}

pub fn items(assets: &[&str]) -> Vec<Item> {
    assets.iter().map(|a| Item::new(*a)).collect()
}

pub fn assets(state: &ContentState) -> Vec<String> {
    state
        .snapshot
        .items(&SectionId::images())
        .iter()
        .map(|item| item.asset.clone())
        .collect()
}

pub struct Fixture {
    pub library: Arc<ScriptedLibrary>,
    pub feed: Arc<ScriptedFeed>,
    pub engine: Engine<LibraryEvent>,
}

impl Fixture {
    pub fn spawn(config: EngineConfig, library: ScriptedLibrary) -> Self {
        init_logging();
        let library = Arc::new(library);
        let feed = Arc::new(ScriptedFeed::new());
        let engine = Engine::spawn(config, Arc::clone(&library), Arc::clone(&library), Arc::clone(&feed));
        Self {
            library,
            feed,
            engine,
        }
    }

    pub async fn loaded(config: EngineConfig, library: ScriptedLibrary) -> Self {
        let fixture = Self::spawn(config, library);
        fixture
            .engine
            .load(&ScriptedAuthorizer::granted())
            .await
            .unwrap();
        fixture
    }

    /// Deliver through the feed and wait until the engine processed it.
    pub async fn emit(&self, event: LibraryEvent) {
        self.feed.emit(event);
        self.engine.flush().await.unwrap();
    }

    pub async fn commit(&self, event: LibraryEvent) {
        self.library.commit(&self.feed, event);
        self.engine.flush().await.unwrap();
    }
}
