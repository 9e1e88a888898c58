//! The hierarchical event bus.

use super::matcher::Matcher;
use super::meta::{Creator, EventMeta};
use super::path::{assert_valid_name, assert_valid_namespace, build_path};
use super::payload::Payload;
use crate::errors::FrameworkError;
use chrono::Utc;
use futures::future::BoxFuture;
use hk_protocol::EventTrace;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};
use uuid::Uuid;

/// Listener callback. Errors from blocking listeners abort the emission.
pub type Callback =
    Arc<dyn Fn(Payload, EventMeta) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Deregisters the listener it was returned for.
pub type CleanupFn = Box<dyn FnOnce() + Send + Sync>;

/// Per-listener options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterOptions {
    /// Await the listener before delivering to the next one. Defaults to `true`.
    pub is_blocking: bool,
    /// Remove the listener after its first delivery.
    pub once: bool,
    /// Keep the listener across [`Emitter::reset`].
    pub persistent: bool,
    /// Receive events emitted by descendants. `None` uses the matcher default.
    pub match_nested: Option<bool>,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            is_blocking: true,
            once: false,
            persistent: false,
            match_nested: None,
        }
    }
}

impl EmitterOptions {
    pub fn non_blocking(mut self) -> Self {
        self.is_blocking = false;
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn match_nested(mut self, match_nested: bool) -> Self {
        self.match_nested = Some(match_nested);
        self
    }
}

/// Options for [`Emitter::new`] and [`Emitter::child`].
///
/// Unset values are inherited from the parent emitter.
#[derive(Debug, Clone, Default)]
pub struct ChildOptions {
    pub namespace: Vec<String>,
    pub creator: Option<Creator>,
    pub group_id: Option<String>,
    /// Merged over the parent's context.
    pub context: Option<Map<String, Value>>,
    pub trace: Option<EventTrace>,
}

impl ChildOptions {
    pub fn namespace<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: segments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_trace(mut self, trace: EventTrace) -> Self {
        self.trace = Some(trace);
        self
    }
}

struct Listener {
    id: u64,
    matcher: Matcher,
    match_nested: bool,
    options: EmitterOptions,
    callback: Callback,
}

impl Listener {
    fn accepts(&self, meta: &EventMeta, emitter_id: u64) -> bool {
        if !self.match_nested && meta.source.id() != emitter_id {
            return false;
        }
        self.matcher.matches(meta)
    }
}

#[derive(Default)]
struct EmitterState {
    listeners: Vec<Arc<Listener>>,
    parent: Option<Arc<EmitterInner>>,
    children: Vec<Weak<EmitterInner>>,
    destroyed: bool,
}

struct EmitterInner {
    id: u64,
    namespace: Vec<String>,
    creator: Option<Creator>,
    group_id: Option<String>,
    trace: Option<EventTrace>,
    context: RwLock<Map<String, Value>>,
    state: Mutex<EmitterState>,
}

impl EmitterInner {
    fn path(&self) -> String {
        build_path(&self.namespace, "")
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// The parent, unless either side has been destroyed.
    fn live_parent(&self) -> Option<Arc<EmitterInner>> {
        let state = self.state.lock();
        if state.destroyed {
            return None;
        }
        let parent = state.parent.clone()?;
        drop(state);
        (!parent.is_destroyed()).then_some(parent)
    }
}

static NEXT_EMITTER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);
static ROOT: OnceLock<Emitter> = OnceLock::new();

/// A node in the event tree.
///
/// Emitting an event delivers it to this emitter's listeners in registration
/// order, then to each ancestor's listeners, nearest first. Blocking listeners
/// are awaited one after another; the first failure stops the delivery and is
/// returned from [`Emitter::emit`].
///
/// A child keeps its parent alive, so events keep reaching every ancestor even
/// when the caller only holds the leaf. Parents track children weakly. Once a
/// parent is destroyed its children keep working on their own but no longer
/// reach the parent's listeners.
///
/// A destroyed emitter rejects `emit`, `child`, `on` and `pipe` with an
/// [`ErrorKind::EmitterDestroyed`](crate::errors::ErrorKind::EmitterDestroyed)
/// error.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<EmitterInner>,
}

impl Emitter {
    /// The process-wide root emitter, created on first use.
    pub fn root() -> Emitter {
        ROOT.get_or_init(Emitter::new_root).clone()
    }

    /// A fresh, isolated root. Tests use this instead of the global root.
    pub fn new_root() -> Emitter {
        Self::from_parts(Vec::new(), Some(Creator::new("root")), None, None, Map::new())
    }

    /// A standalone emitter with no parent.
    pub fn new(options: ChildOptions) -> Result<Emitter, FrameworkError> {
        assert_valid_namespace(&options.namespace)?;
        Ok(Self::from_parts(
            options.namespace,
            options.creator,
            options.group_id,
            options.trace,
            options.context.unwrap_or_default(),
        ))
    }

    fn from_parts(
        namespace: Vec<String>,
        creator: Option<Creator>,
        group_id: Option<String>,
        trace: Option<EventTrace>,
        context: Map<String, Value>,
    ) -> Emitter {
        Emitter {
            inner: Arc::new(EmitterInner {
                id: NEXT_EMITTER_ID.fetch_add(1, Ordering::Relaxed),
                namespace,
                creator,
                group_id,
                trace,
                context: RwLock::new(context),
                state: Mutex::new(EmitterState::default()),
            }),
        }
    }

    /// Forks a child whose namespace is this namespace followed by
    /// `options.namespace`.
    pub fn child(&self, options: ChildOptions) -> Result<Emitter, FrameworkError> {
        self.ensure_alive()?;
        let mut namespace = self.inner.namespace.clone();
        namespace.extend(options.namespace);
        assert_valid_namespace(&namespace)?;

        let mut context = self.context();
        if let Some(extra) = options.context {
            context.extend(extra);
        }

        let child = Self::from_parts(
            namespace,
            options.creator.or_else(|| self.inner.creator.clone()),
            options.group_id.or_else(|| self.inner.group_id.clone()),
            options.trace.or_else(|| self.inner.trace.clone()),
            context,
        );
        child.inner.state.lock().parent = Some(self.inner.clone());

        let mut state = self.inner.state.lock();
        state.children.retain(|c| c.strong_count() > 0);
        state.children.push(Arc::downgrade(&child.inner));
        Ok(child)
    }

    /// Registers `callback` for events named `name` (or a dotted path / wildcard).
    pub fn on<F, Fut>(&self, name: &str, callback: F) -> Result<CleanupFn, FrameworkError>
    where
        F: Fn(Payload, EventMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_match(name, callback, EmitterOptions::default())
    }

    pub fn on_with<F, Fut>(
        &self,
        name: &str,
        callback: F,
        options: EmitterOptions,
    ) -> Result<CleanupFn, FrameworkError>
    where
        F: Fn(Payload, EventMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_match(name, callback, options)
    }

    /// Registers a listener for any [`Matcher`].
    pub fn on_match<M, F, Fut>(
        &self,
        matcher: M,
        callback: F,
        options: EmitterOptions,
    ) -> Result<CleanupFn, FrameworkError>
    where
        M: Into<Matcher>,
        F: Fn(Payload, EventMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: Callback = Arc::new(
            move |data: Payload, meta: EventMeta| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(callback(data, meta))
            },
        );
        self.register(matcher.into(), callback, options)
    }

    /// Registers a typed listener. Events whose payload is not a `T` are skipped.
    pub fn on_typed<T, F, Fut>(&self, name: &str, callback: F) -> Result<CleanupFn, FrameworkError>
    where
        T: Any + Clone + Send + Sync,
        F: Fn(T, EventMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: Callback = Arc::new(
            move |data: Payload, meta: EventMeta| -> BoxFuture<'static, anyhow::Result<()>> {
                match data.downcast_ref::<T>() {
                    Some(value) => Box::pin(callback(value.clone(), meta)),
                    None => Box::pin(async { Ok(()) }),
                }
            },
        );
        self.register(Matcher::from(name), callback, EmitterOptions::default())
    }

    pub fn register(
        &self,
        matcher: Matcher,
        callback: Callback,
        options: EmitterOptions,
    ) -> Result<CleanupFn, FrameworkError> {
        self.ensure_alive()?;
        matcher.validate()?;

        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        let match_nested = options
            .match_nested
            .unwrap_or_else(|| matcher.default_match_nested());
        debug!(
            emitter = %self.path(),
            matcher = ?matcher,
            match_nested,
            "Registering listener"
        );
        self.inner.state.lock().listeners.push(Arc::new(Listener {
            id,
            matcher,
            match_nested,
            options,
            callback,
        }));

        let emitter = Arc::downgrade(&self.inner);
        Ok(Box::new(move || {
            if let Some(inner) = emitter.upgrade() {
                inner.state.lock().listeners.retain(|l| l.id != id);
            }
        }))
    }

    /// Emits a serializable value.
    pub async fn emit<T>(&self, name: &str, data: T) -> Result<(), FrameworkError>
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.emit_payload(name, Payload::serializable(data)).await
    }

    /// Emits a prepared payload and waits for every blocking listener.
    pub async fn emit_payload(&self, name: &str, data: Payload) -> Result<(), FrameworkError> {
        assert_valid_name(name)?;
        self.ensure_alive()?;

        let meta = self.create_event(name);
        debug!(path = %meta.path, id = %meta.id, "Emitting event");

        let mut current = Some(self.inner.clone());
        while let Some(node) = current {
            Self::invoke(node.clone(), data.clone(), meta.clone()).await?;
            current = node.live_parent();
        }
        Ok(())
    }

    /// Delivers to the matching listeners of a single emitter.
    fn invoke(
        node: Arc<EmitterInner>,
        data: Payload,
        meta: EventMeta,
    ) -> BoxFuture<'static, Result<(), FrameworkError>> {
        Box::pin(async move {
            let selected: Vec<Arc<Listener>> = {
                let mut state = node.state.lock();
                if state.destroyed {
                    return Ok(());
                }
                let mut selected = Vec::new();
                state.listeners.retain(|listener| {
                    if !listener.accepts(&meta, node.id) {
                        return true;
                    }
                    selected.push(listener.clone());
                    !listener.options.once
                });
                selected
            };

            for listener in selected {
                let pending = (listener.callback)(data.clone(), meta.clone());
                if listener.options.is_blocking {
                    pending
                        .await
                        .map_err(|error| FrameworkError::listener_failed(&meta.path, error))?;
                } else {
                    let path = meta.path.clone();
                    tokio::spawn(async move {
                        if let Err(error) = pending.await {
                            warn!(path = %path, error = %error, "Non-blocking listener failed");
                        }
                    });
                }
            }
            Ok(())
        })
    }

    /// Forwards every event delivered here, nested ones included, to the
    /// listeners of `target`. Target ancestors are not involved.
    pub fn pipe(&self, target: &Emitter) -> Result<CleanupFn, FrameworkError> {
        target.ensure_alive()?;
        let target = Arc::downgrade(&target.inner);
        let callback: Callback = Arc::new(
            move |data: Payload, meta: EventMeta| -> BoxFuture<'static, anyhow::Result<()>> {
                let target = target.clone();
                Box::pin(async move {
                    match target.upgrade() {
                        Some(node) => Emitter::invoke(node, data, meta)
                            .await
                            .map_err(anyhow::Error::from),
                        None => Ok(()),
                    }
                })
            },
        );
        self.register(
            Matcher::AnyNested,
            callback,
            EmitterOptions::default().persistent().match_nested(true),
        )
    }

    /// Removes every non-persistent listener of this emitter.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.listeners.retain(|l| l.options.persistent);
        debug!(emitter = %self.inner.path(), "Emitter reset");
    }

    /// Removes all listeners, detaches from the parent and rejects further use.
    pub fn destroy(&self) {
        let mut state = self.inner.state.lock();
        state.listeners.clear();
        state.parent = None;
        state.destroyed = true;
        debug!(emitter = %self.inner.path(), "Emitter destroyed");
    }

    /// Destroys this emitter and every live descendant.
    pub fn destroy_tree(&self) {
        let children: Vec<Emitter> = {
            let mut state = self.inner.state.lock();
            let children = state
                .children
                .iter()
                .filter_map(Weak::upgrade)
                .map(|inner| Emitter { inner })
                .collect();
            state.children.clear();
            children
        };
        self.destroy();
        for child in children {
            child.destroy_tree();
        }
    }

    /// Merges `context` into the correlation data of future events.
    pub fn extend_context(&self, context: Map<String, Value>) {
        self.inner.context.write().extend(context);
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn namespace(&self) -> &[String] {
        &self.inner.namespace
    }

    /// The dotted namespace.
    pub fn path(&self) -> String {
        self.inner.path()
    }

    pub fn creator(&self) -> Option<&Creator> {
        self.inner.creator.as_ref()
    }

    pub fn group_id(&self) -> Option<&str> {
        self.inner.group_id.as_deref()
    }

    pub fn trace(&self) -> Option<&EventTrace> {
        self.inner.trace.as_ref()
    }

    pub fn context(&self) -> Map<String, Value> {
        self.inner.context.read().clone()
    }

    pub fn parent(&self) -> Option<Emitter> {
        self.inner.live_parent().map(|inner| Emitter { inner })
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }

    pub fn same_as(&self, other: &Emitter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_alive(&self) -> Result<(), FrameworkError> {
        if self.is_destroyed() {
            Err(FrameworkError::emitter_destroyed(&self.path()))
        } else {
            Ok(())
        }
    }

    fn create_event(&self, name: &str) -> EventMeta {
        EventMeta {
            id: Uuid::new_v4().to_string(),
            group_id: self.inner.group_id.clone(),
            name: name.to_string(),
            path: build_path(&self.inner.namespace, name),
            created_at: Utc::now(),
            source: self.clone(),
            creator: self.inner.creator.clone(),
            context: self.context(),
            trace: self.inner.trace.clone(),
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("id", &self.inner.id)
            .field("namespace", &self.inner.namespace)
            .field("creator", &self.inner.creator)
            .finish()
    }
}
