//! Listener registry — listeners are stored per event name with a priority,
//! in insertion order.
//!
//! The registry is pure bookkeeping: it never sorts and never invokes
//! anything. Ordering across local and linked entries is applied by the
//! dispatch engine when a chain is resolved, so insertion order must be
//! preserved here (equal-priority listeners fire in registration order).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::debug;

use hookbus_core::{HubResult, Payload};

use crate::dispatch::Next;

/// A single event listener.
///
/// Listeners are invoked with the chain's current payload and a [`Next`]
/// continuation handle. Return `Ok(None)` to proceed with the payload as it
/// now stands (in-place mutations included), `Ok(Some(p))` to substitute a
/// replacement for everything downstream, or `Err` to reject the chain.
///
/// A synchronous listener is simply one whose body never awaits; the engine
/// runs such listeners to completion before `emit` returns control.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Handles one chain stage.
    async fn call(&self, payload: &mut Payload, next: &Next) -> HubResult<Option<Payload>>;
}

struct FnListener<F>(F);

#[async_trait]
impl<F> Listener for FnListener<F>
where
    F: Fn(&mut Payload) -> HubResult<Option<Payload>> + Send + Sync,
{
    async fn call(&self, payload: &mut Payload, _next: &Next) -> HubResult<Option<Payload>> {
        (self.0)(payload)
    }
}

/// Wraps a synchronous closure as a [`Listener`]. The continuation is left
/// untouched, so the chain advances on its own after the closure returns.
pub fn listener_fn<F>(f: F) -> Arc<dyn Listener>
where
    F: Fn(&mut Payload) -> HubResult<Option<Payload>> + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

struct AsyncFnListener<F>(F);

#[async_trait]
impl<F> Listener for AsyncFnListener<F>
where
    F: Fn(Payload, Next) -> BoxFuture<'static, HubResult<Option<Payload>>> + Send + Sync,
{
    async fn call(&self, payload: &mut Payload, next: &Next) -> HubResult<Option<Payload>> {
        (self.0)(payload.clone(), next.clone()).await
    }
}

/// Wraps a future-returning closure as a [`Listener`].
///
/// The closure receives its own copy of the payload and a handle on the
/// continuation, so it can defer, await [`Next::run`], or both. Because the
/// payload is a copy, changes are published by returning `Ok(Some(...))`,
/// not by mutation.
pub fn async_listener_fn<F>(f: F) -> Arc<dyn Listener>
where
    F: Fn(Payload, Next) -> BoxFuture<'static, HubResult<Option<Payload>>> + Send + Sync + 'static,
{
    Arc::new(AsyncFnListener(f))
}

/// Entry in the listener registry.
#[derive(Clone)]
pub(crate) struct ListenerEntry {
    /// Registry-unique id, used by `once` adapters for self-removal.
    id: u64,
    /// Priority; higher fires sooner.
    pub(crate) priority: i32,
    /// The listener.
    pub(crate) listener: Arc<dyn Listener>,
}

/// Registry of listeners organized by event name.
///
/// Invariant: an event key is present only while its entry list is
/// non-empty; removing the last entry deletes the key.
pub struct Registry {
    /// Event name → entries in insertion order.
    events: RwLock<HashMap<String, Vec<ListenerEntry>>>,
    /// Id source for entries.
    next_id: AtomicU64,
}

impl Registry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn reserve_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Appends a listener for a single event name.
    pub(crate) fn insert(&self, event: &str, priority: i32, listener: Arc<dyn Listener>) {
        let id = self.reserve_id();
        self.insert_with_id(event, id, priority, listener);
    }

    fn insert_with_id(&self, event: &str, id: u64, priority: i32, listener: Arc<dyn Listener>) {
        let mut events = self.events.write();
        events
            .entry(event.to_string())
            .or_default()
            .push(ListenerEntry {
                id,
                priority,
                listener,
            });
        debug!(event, priority, "listener registered");
    }

    /// Appends a self-removing adapter around `listener` for a single event
    /// name. The adapter removes itself from `registry` before delegating,
    /// so the inner listener fires at most once per registration. Removal
    /// guards registration, not invocation: a chain that resolved the
    /// adapter before removal still invokes it.
    pub(crate) fn insert_once(
        registry: &Arc<Registry>,
        event: &str,
        priority: i32,
        listener: Arc<dyn Listener>,
    ) {
        let id = registry.reserve_id();
        let wrapper = Arc::new(OnceListener {
            event: event.to_string(),
            id,
            registry: Arc::downgrade(registry),
            inner: listener,
        });
        registry.insert_with_id(event, id, priority, wrapper);
    }

    /// Removes every listener for a single event name. No-op if absent.
    pub(crate) fn remove_all(&self, event: &str) {
        let mut events = self.events.write();
        if events.remove(event).is_some() {
            debug!(event, "all listeners removed");
        }
    }

    /// Removes the first entry whose listener is pointer-identical to
    /// `listener`. No-op if the event or listener is not found.
    pub(crate) fn remove_listener(&self, event: &str, listener: &Arc<dyn Listener>) {
        let mut events = self.events.write();
        let Some(entries) = events.get_mut(event) else {
            return;
        };
        if let Some(pos) = entries
            .iter()
            .position(|e| Arc::ptr_eq(&e.listener, listener))
        {
            entries.remove(pos);
            debug!(event, "listener removed");
        }
        if entries.is_empty() {
            events.remove(event);
        }
    }

    /// Removes the entry with the given id. Used by `once` adapters.
    fn remove_id(&self, event: &str, id: u64) {
        let mut events = self.events.write();
        let Some(entries) = events.get_mut(event) else {
            return;
        };
        entries.retain(|e| e.id != id);
        if entries.is_empty() {
            events.remove(event);
        }
    }

    /// Returns a copy of the entries for an event, in insertion order.
    pub(crate) fn snapshot(&self, event: &str) -> Vec<ListenerEntry> {
        self.events.read().get(event).cloned().unwrap_or_default()
    }

    /// Returns whether any listeners are registered for an event.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.events.read().contains_key(event)
    }

    /// Returns the number of listeners registered for an event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.events
            .read()
            .get(event)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Returns all event names with at least one listener.
    pub fn event_names(&self) -> Vec<String> {
        self.events.read().keys().cloned().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter stored by `once`: removes its own registration, then delegates.
struct OnceListener {
    event: String,
    id: u64,
    registry: Weak<Registry>,
    inner: Arc<dyn Listener>,
}

#[async_trait]
impl Listener for OnceListener {
    async fn call(&self, payload: &mut Payload, next: &Next) -> HubResult<Option<Payload>> {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_id(&self.event, self.id);
        }
        self.inner.call(payload, next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn Listener> {
        listener_fn(|_payload| Ok(None))
    }

    #[test]
    fn test_insert_preserves_order() {
        let registry = Registry::new();
        let a = noop();
        let b = noop();
        registry.insert("foo", 0, a.clone());
        registry.insert("foo", 0, b.clone());

        let entries = registry.snapshot("foo");
        assert_eq!(entries.len(), 2);
        assert!(Arc::ptr_eq(&entries[0].listener, &a));
        assert!(Arc::ptr_eq(&entries[1].listener, &b));
    }

    #[test]
    fn test_remove_all_deletes_key() {
        let registry = Registry::new();
        registry.insert("foo", 0, noop());
        registry.insert("foo", 0, noop());
        assert!(registry.has_listeners("foo"));

        registry.remove_all("foo");
        assert!(!registry.has_listeners("foo"));
        assert_eq!(registry.listener_count("foo"), 0);

        // removing a non-existent event is a no-op
        registry.remove_all("foo");
    }

    #[test]
    fn test_remove_listener_first_match_only() {
        let registry = Registry::new();
        let dup = noop();
        registry.insert("foo", 0, dup.clone());
        registry.insert("foo", 0, dup.clone());

        registry.remove_listener("foo", &dup);
        assert_eq!(registry.listener_count("foo"), 1);

        registry.remove_listener("foo", &dup);
        assert!(!registry.has_listeners("foo"));
    }

    #[test]
    fn test_remove_unknown_listener_is_noop() {
        let registry = Registry::new();
        let known = noop();
        let unknown = noop();
        registry.insert("foo", 0, known);

        registry.remove_listener("foo", &unknown);
        assert_eq!(registry.listener_count("foo"), 1);

        registry.remove_listener("bar", &unknown);
    }

    #[test]
    fn test_event_names() {
        let registry = Registry::new();
        registry.insert("foo", 0, noop());
        registry.insert("bar", 5, noop());

        let mut names = registry.event_names();
        names.sort();
        assert_eq!(names, vec!["bar".to_string(), "foo".to_string()]);
    }
}
