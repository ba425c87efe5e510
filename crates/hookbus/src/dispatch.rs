//! Dispatch engine — turns the registered listener set for an event into a
//! single ordered, future-resolving execution chain.
//!
//! Resolution happens fresh on every invocation (registrations may change
//! between calls) and snapshots are immune to mid-chain mutation. The chain
//! interleaves synchronous and asynchronous listeners: a listener whose
//! future completes on first poll is driven inline, so an all-synchronous
//! chain finishes before `emit` returns control to its caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::task::noop_waker;
use parking_lot::Mutex;
use tracing::debug;

use hookbus_core::{HubError, HubResult, Payload};

use crate::emitter::Emitter;
use crate::registry::Listener;

/// Folds a listener's return value into the payload handed to the next
/// chain stage. The first argument is the listener's result (`None` when it
/// returned nothing); the second is the payload the listener was invoked
/// with, including any in-place mutations.
pub type Transform = Arc<dyn Fn(Option<Payload>, &Payload) -> Payload + Send + Sync>;

/// Default transform: a returned payload contributes its arguments, the
/// event name and hook state stay as they were; no result keeps the payload
/// untouched.
pub(crate) fn default_transform() -> Transform {
    Arc::new(|result, payload| match result {
        Some(replacement) => payload.with_args(replacement.args),
        None => payload.clone(),
    })
}

/// Options for [`Emitter::compose`].
pub struct ComposeOptions {
    /// The event name the dispatcher resolves listeners for.
    pub event: String,
    /// Optional terminal pseudo-listener, appended after every resolved
    /// listener.
    pub callback: Option<Arc<dyn Listener>>,
    /// Payload fold; defaults to argument replacement.
    pub transform: Option<Transform>,
}

/// A reusable dispatcher for one event name.
///
/// Each [`run`](Dispatcher::run) resolves the current listener set (local
/// entries first, then entries pulled in through links in link order, the
/// whole set stably sorted by priority descending) and drives one chain
/// over it.
pub struct Dispatcher {
    emitter: Emitter,
    event: String,
    callback: Option<Arc<dyn Listener>>,
    transform: Transform,
}

impl Dispatcher {
    pub(crate) fn new(emitter: Emitter, options: ComposeOptions) -> Self {
        Self {
            emitter,
            event: options.event,
            callback: options.callback,
            transform: options.transform.unwrap_or_else(default_transform),
        }
    }

    /// Starts one chain over the currently registered listeners.
    ///
    /// The synchronous prefix of the chain runs during this call; the
    /// returned future settles the remainder.
    pub fn run(&self, payload: Payload) -> Dispatch {
        let mut listeners = self.emitter.resolve(&self.event);
        if let Some(callback) = &self.callback {
            listeners.push(callback.clone());
        }

        debug!(
            event = %self.event,
            listeners = listeners.len(),
            "running dispatch chain"
        );

        let state = Arc::new(ChainState {
            event: self.event.clone(),
            listeners,
            transform: self.transform.clone(),
        });
        Dispatch::new(dispatch(state, payload, 0))
    }
}

/// Immutable per-chain state shared by all frames of one invocation.
pub(crate) struct ChainState {
    event: String,
    listeners: Vec<Arc<dyn Listener>>,
    transform: Transform,
}

/// One chain frame: invoke the listener at `index`, fold its outcome, and
/// either hand the chain's settled value back (when the listener advanced it
/// through [`Next`]) or recurse into the following frame.
fn dispatch(
    state: Arc<ChainState>,
    mut payload: Payload,
    index: usize,
) -> BoxFuture<'static, HubResult<Payload>> {
    async move {
        let Some(listener) = state.listeners.get(index).cloned() else {
            debug!(event = %state.event, "end of dispatch chain");
            return Ok(payload);
        };

        debug!(event = %state.event, index, "calling listener");

        let next = Next::new(state.clone(), index + 1);
        let ret = listener.call(&mut payload, &next).await;

        // A rejection inside a next-driven continuation wins even when the
        // listener swallowed it.
        if let Some(err) = next.take_error() {
            return Err(err);
        }
        let ret = ret?;

        let folded = (state.transform)(ret, &payload);
        if next.seal() {
            // The listener already drove the remainder; the folded value is
            // the chain's, with no second traversal.
            Ok(folded)
        } else {
            dispatch(state, folded, index + 1).await
        }
    }
    .boxed()
}

/// Continuation handle passed to every listener.
///
/// Invoking [`run`](Next::run) drives the remainder of the chain with the
/// given payload and resolves to its settled value. Only the first call per
/// frame advances the chain; later calls, including calls on a clone stashed
/// past the frame's lifetime, are a documented no-op that resolves with the
/// payload unchanged.
#[derive(Clone)]
pub struct Next {
    inner: Arc<NextInner>,
}

struct NextInner {
    state: Arc<ChainState>,
    index: usize,
    fired: AtomicBool,
    error: Mutex<Option<HubError>>,
}

impl Next {
    fn new(state: Arc<ChainState>, index: usize) -> Self {
        Self {
            inner: Arc::new(NextInner {
                state,
                index,
                fired: AtomicBool::new(false),
                error: Mutex::new(None),
            }),
        }
    }

    /// Runs the rest of the chain with `payload`.
    ///
    /// On the first call, the remaining listeners (and terminal callback, if
    /// any) execute and their settled payload is returned; the calling
    /// listener's own return value then becomes the chain's result without a
    /// second traversal. Later calls log and return `payload` untouched.
    pub async fn run(&self, payload: Payload) -> HubResult<Payload> {
        if self.seal() {
            debug!(
                event = %self.inner.state.event,
                "continuation already invoked; ignoring"
            );
            return Ok(payload);
        }

        match dispatch(self.inner.state.clone(), payload, self.inner.index).await {
            Ok(settled) => Ok(settled),
            Err(err) => {
                let mut slot = self.inner.error.lock();
                if slot.is_none() {
                    *slot = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Marks the continuation as used, returning whether it already was.
    /// The frame seals it before advancing on its own, so a handle stashed
    /// by a listener cannot re-run the remainder later.
    pub(crate) fn seal(&self) -> bool {
        self.inner.fired.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn take_error(&self) -> Option<HubError> {
        self.inner.error.lock().take()
    }
}

/// The future returned by [`Emitter::emit`] and [`Dispatcher::run`],
/// resolving to the chain's final payload.
///
/// Construction eagerly polls the chain once, so listeners that never
/// suspend have already run, side effects included, by the time the caller
/// holds this value. Dropping it without awaiting cancels only listeners
/// that had not yet run.
pub struct Dispatch {
    state: DispatchState,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}

enum DispatchState {
    Done(Option<HubResult<Payload>>),
    Running(BoxFuture<'static, HubResult<Payload>>),
}

impl Dispatch {
    pub(crate) fn new(mut chain: BoxFuture<'static, HubResult<Payload>>) -> Self {
        // Drive the synchronous prefix inline. A chain of listeners that
        // never suspend completes right here, on the caller's stack.
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let state = match chain.as_mut().poll(&mut cx) {
            Poll::Ready(out) => DispatchState::Done(Some(out)),
            Poll::Pending => DispatchState::Running(chain),
        };
        Self { state }
    }
}

impl Future for Dispatch {
    type Output = HubResult<Payload>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            DispatchState::Done(slot) => match slot.take() {
                Some(out) => Poll::Ready(out),
                None => panic!("`Dispatch` polled after completion"),
            },
            DispatchState::Running(chain) => chain.as_mut().poll(cx),
        }
    }
}
