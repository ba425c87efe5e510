//! Emitter facade — the public registration, emission, hook, and link
//! surface.
//!
//! `Emitter` is a cheap-clone handle over shared state; clones address the
//! same registry and link table. Registration methods validate their inputs
//! and return synchronously, so callers catch bad arguments with ordinary
//! error handling rather than through a rejected future.

use std::cmp::Reverse;
use std::sync::Arc;

use serde_json::Value;

use hookbus_core::{HookTarget, HubError, HubResult, Payload};

use crate::dispatch::{ComposeOptions, Dispatch, Dispatcher};
use crate::hook::Hooked;
use crate::link::LinkTable;
use crate::registry::{Listener, Registry};

/// Emits events and hooks to synchronous and asynchronous listeners.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<EmitterInner>,
}

struct EmitterInner {
    registry: Arc<Registry>,
    links: LinkTable,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

impl Emitter {
    /// Creates an emitter with no listeners and no links.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                registry: Arc::new(Registry::new()),
                links: LinkTable::new(),
            }),
        }
    }

    /// Read-only view of the listener registry.
    pub fn events(&self) -> &Registry {
        &self.inner.registry
    }

    /// Adds a listener with default priority.
    ///
    /// `events` is one or more whitespace-separated event names; the
    /// listener is appended to each.
    pub fn on(&self, events: &str, listener: Arc<dyn Listener>) -> HubResult<&Self> {
        self.on_with_priority(events, 0, listener)
    }

    /// Adds a listener. The higher the priority, the sooner it runs; equal
    /// priorities fire in registration order.
    pub fn on_with_priority(
        &self,
        events: &str,
        priority: i32,
        listener: Arc<dyn Listener>,
    ) -> HubResult<&Self> {
        for name in split_event_names(events)? {
            self.inner.registry.insert(name, priority, listener.clone());
        }
        Ok(self)
    }

    /// Adds a listener that is removed from the registry the first time it
    /// is invoked, independently per named event.
    pub fn once(&self, events: &str, listener: Arc<dyn Listener>) -> HubResult<&Self> {
        self.once_with_priority(events, 0, listener)
    }

    /// Adds a fire-once listener with a priority.
    pub fn once_with_priority(
        &self,
        events: &str,
        priority: i32,
        listener: Arc<dyn Listener>,
    ) -> HubResult<&Self> {
        for name in split_event_names(events)? {
            Registry::insert_once(&self.inner.registry, name, priority, listener.clone());
        }
        Ok(self)
    }

    /// Removes all listeners for each named event. Unknown events are a
    /// no-op.
    pub fn off(&self, events: &str) -> HubResult<&Self> {
        for name in split_event_names(events)? {
            self.inner.registry.remove_all(name);
        }
        Ok(self)
    }

    /// Removes the first matching registration of `listener` (by `Arc`
    /// identity) from each named event. Unknown events or listeners are a
    /// no-op.
    pub fn off_listener(&self, events: &str, listener: &Arc<dyn Listener>) -> HubResult<&Self> {
        for name in split_event_names(events)? {
            self.inner.registry.remove_listener(name, listener);
        }
        Ok(self)
    }

    /// Emits an event to all of its listeners, local and linked.
    ///
    /// Listeners that never suspend have run, side effects included, by the
    /// time this returns; the returned future settles the rest of the chain
    /// and resolves to the final payload.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> HubResult<Dispatch> {
        validate_event_name(event)?;
        let dispatcher = self.compose(ComposeOptions {
            event: event.to_string(),
            callback: None,
            transform: None,
        });
        Ok(dispatcher.run(Payload::new(event, args)))
    }

    /// Builds a reusable dispatcher for one event name.
    pub fn compose(&self, options: ComposeOptions) -> Dispatcher {
        Dispatcher::new(self.clone(), options)
    }

    /// Wraps a function in an interception chain for `event`.
    pub fn hook(&self, event: &str, target: Arc<dyn HookTarget>) -> HubResult<Hooked> {
        validate_event_name(event)?;
        Ok(Hooked::new(self.clone(), event, None, target))
    }

    /// Wraps a function with a bound context object. Listeners and the
    /// function itself see the context through the chain's payload.
    pub fn hook_with_context(
        &self,
        event: &str,
        ctx: Value,
        target: Arc<dyn HookTarget>,
    ) -> HubResult<Hooked> {
        validate_event_name(event)?;
        if !ctx.is_object() {
            return Err(HubError::invalid_context(
                "expected hook context to be a JSON object",
            ));
        }
        Ok(Hooked::new(self.clone(), event, Some(ctx), target))
    }

    /// Links another emitter's listeners into this instance's chains: when
    /// this instance emits, the target's listeners for the same event fire
    /// too (after local ones at equal priority). Not reciprocal, and not
    /// transitive through the target's own links. Linking the same target
    /// again adds a second, independent entry.
    pub fn link(&self, target: &Emitter) -> &Self {
        self.inner.links.add(target.clone(), None);
        self
    }

    /// Links another emitter under a prefix: this instance's chains for
    /// `event` pull the target's listeners registered for `{prefix}{event}`.
    pub fn link_with_prefix(&self, target: &Emitter, prefix: &str) -> &Self {
        self.inner.links.add(target.clone(), Some(prefix.to_string()));
        self
    }

    /// Removes every link to the target. No-op if none exist.
    pub fn unlink(&self, target: &Emitter) -> &Self {
        self.inner.links.remove_all(target);
        self
    }

    pub(crate) fn same_instance(&self, other: &Emitter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolves the ordered listener list for one chain: local entries for
    /// `event`, then each link's entries for the (prefixed) event name in
    /// link order, stably sorted by priority descending. Performed fresh on
    /// every invocation; the result is a snapshot immune to later registry
    /// mutation.
    pub(crate) fn resolve(&self, event: &str) -> Vec<Arc<dyn Listener>> {
        let mut entries = self.inner.registry.snapshot(event);
        for link in self.inner.links.snapshot() {
            let name = match &link.prefix {
                Some(prefix) => format!("{prefix}{event}"),
                None => event.to_string(),
            };
            entries.extend(link.target.inner.registry.snapshot(&name));
        }

        // Stable sort: ties keep concatenation order, local before linked,
        // insertion order within each side.
        entries.sort_by_key(|entry| Reverse(entry.priority));
        entries.into_iter().map(|entry| entry.listener).collect()
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_event_name(event: &str) -> HubResult<()> {
    if event.trim().is_empty() {
        return Err(HubError::invalid_argument(
            "expected event name to be a non-empty string",
        ));
    }
    Ok(())
}

fn split_event_names(events: &str) -> HubResult<Vec<&str>> {
    let names: Vec<&str> = events.split_whitespace().collect();
    if names.is_empty() {
        return Err(HubError::invalid_argument(
            "expected event name to be a non-empty string",
        ));
    }
    Ok(names)
}
