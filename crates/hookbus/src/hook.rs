//! Hook wrapper — a dispatch chain wrapped transparently around a function
//! call.
//!
//! Listeners registered for the hook's event run before the wrapped function
//! and may observe or rewrite its arguments (and, by substituting a
//! replacement payload, everything downstream). The terminal callback then
//! invokes the function with whatever context survived the chain and stores
//! its return value in the payload's result slot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use serde_json::Value;

use hookbus_core::{HookState, HookTarget, HubError, HubResult, Payload};

use crate::dispatch::{ComposeOptions, Dispatch, Dispatcher, Next};
use crate::emitter::Emitter;
use crate::registry::Listener;

/// Terminal pseudo-listener: invokes the wrapped function and records its
/// return value on the payload that reached the end of the chain.
struct TerminalCall;

#[async_trait]
impl Listener for TerminalCall {
    async fn call(&self, payload: &mut Payload, _next: &Next) -> HubResult<Option<Payload>> {
        let (target, ctx) = match payload.hook.as_ref() {
            Some(hook) => (hook.target.clone(), hook.ctx.clone()),
            None => {
                return Err(HubError::invalid_state(
                    "hook chain reached its terminal callback without the wrapped function",
                ));
            }
        };

        let value = target.invoke(ctx, payload.args.clone()).await?;
        if let Some(hook) = payload.hook.as_mut() {
            hook.result = Some(value);
        }
        Ok(None)
    }
}

/// A hooked function, created by [`Emitter::hook`].
///
/// Reusable: every [`call`](Hooked::call) resolves the listener set afresh
/// and drives one chain ending in the wrapped function.
pub struct Hooked {
    dispatcher: Dispatcher,
    event: String,
    ctx: Option<Value>,
    target: Arc<dyn HookTarget>,
}

impl std::fmt::Debug for Hooked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooked").finish_non_exhaustive()
    }
}

impl Hooked {
    pub(crate) fn new(
        emitter: Emitter,
        event: &str,
        ctx: Option<Value>,
        target: Arc<dyn HookTarget>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            emitter,
            ComposeOptions {
                event: event.to_string(),
                callback: Some(Arc::new(TerminalCall)),
                // Hook chains propagate whole payloads: a listener's returned
                // payload supersedes the current one outright.
                transform: Some(Arc::new(|result, payload| {
                    result.unwrap_or_else(|| payload.clone())
                })),
            },
        );
        Self {
            dispatcher,
            event: event.to_string(),
            ctx,
            target,
        }
    }

    /// The event name the wrapper dispatches on.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Invokes the wrapped function through its interception chain.
    ///
    /// Resolves to the function's return value as possibly observed or
    /// replaced along the chain. A listener error anywhere before the
    /// terminal callback propagates here and the function is never invoked.
    /// As with [`Emitter::emit`], listeners that never suspend run during
    /// this call itself.
    pub fn call(&self, args: Vec<Value>) -> HookCall {
        let payload = Payload::hooked(
            self.event.clone(),
            args,
            HookState {
                target: self.target.clone(),
                ctx: self.ctx.clone(),
                result: None,
            },
        );
        HookCall {
            inner: self.dispatcher.run(payload),
        }
    }
}

/// The future returned by [`Hooked::call`], resolving to the wrapped
/// function's return value.
pub struct HookCall {
    inner: Dispatch,
}

impl Future for HookCall {
    type Output = HubResult<Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().inner).poll(cx) {
            Poll::Ready(Ok(payload)) => {
                Poll::Ready(Ok(payload.result().cloned().unwrap_or(Value::Null)))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Pending => Poll::Pending,
        }
    }
}
