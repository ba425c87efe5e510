//! The payload record that flows through a dispatch chain, and the contract
//! for functions wrapped by hooks.
//!
//! A [`Payload`] is transient, per-invocation state: the event name plus its
//! positional arguments. For hooked calls it additionally carries a
//! [`HookState`] with the wrapped target function, the optional bound
//! context object, and the slot the terminal callback stores the target's
//! return value into. Propagation is by replacement: each chain stage either
//! mutates the payload it was handed or hands back a substitute.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::result::HubResult;

/// A function wrapped by a hook.
///
/// The dispatch chain runs first; the terminal callback then invokes the
/// target with whatever context object and arguments survived the chain.
/// Targets must be `Send + Sync` because chains may be driven from any task.
#[async_trait]
pub trait HookTarget: Send + Sync {
    /// Invoke the wrapped function.
    ///
    /// `ctx` is the bound context object the hook was created with (if any),
    /// as possibly replaced by a listener along the chain.
    async fn invoke(&self, ctx: Option<Value>, args: Vec<Value>) -> HubResult<Value>;
}

/// Hook-only portion of a [`Payload`].
///
/// Present only on chains started by a hooked call. A listener that
/// substitutes a replacement payload carries this along via `Clone`; a
/// replacement built without it makes the terminal callback fail with
/// `InvalidState`.
#[derive(Clone)]
pub struct HookState {
    /// The wrapped function.
    pub target: Arc<dyn HookTarget>,
    /// Optional bound context object (always a JSON object when present).
    pub ctx: Option<Value>,
    /// Return value of the target, populated only by the terminal callback.
    pub result: Option<Value>,
}

impl fmt::Debug for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookState")
            .field("ctx", &self.ctx)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// What flows down a dispatch chain.
#[derive(Debug, Clone)]
pub struct Payload {
    /// The event name the chain was started for.
    pub event: String,
    /// Positional arguments; listeners may mutate these in place.
    pub args: Vec<Value>,
    /// Hook-only state; `None` on plain emissions.
    pub hook: Option<HookState>,
}

impl Payload {
    /// Creates a payload for a plain emission.
    pub fn new(event: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            event: event.into(),
            args,
            hook: None,
        }
    }

    /// Creates a payload for a hooked call.
    pub fn hooked(event: impl Into<String>, args: Vec<Value>, hook: HookState) -> Self {
        Self {
            event: event.into(),
            args,
            hook: Some(hook),
        }
    }

    /// Returns a copy of this payload with the arguments replaced.
    pub fn with_args(&self, args: Vec<Value>) -> Self {
        Self {
            event: self.event.clone(),
            args,
            hook: self.hook.clone(),
        }
    }

    /// The target's return value, if the terminal callback has run.
    pub fn result(&self) -> Option<&Value> {
        self.hook.as_ref().and_then(|h| h.result.as_ref())
    }
}

struct FnHookTarget<F>(F);

#[async_trait]
impl<F> HookTarget for FnHookTarget<F>
where
    F: Fn(Option<Value>, Vec<Value>) -> HubResult<Value> + Send + Sync,
{
    async fn invoke(&self, ctx: Option<Value>, args: Vec<Value>) -> HubResult<Value> {
        (self.0)(ctx, args)
    }
}

/// Wraps a synchronous closure as a [`HookTarget`].
pub fn target_fn<F>(f: F) -> Arc<dyn HookTarget>
where
    F: Fn(Option<Value>, Vec<Value>) -> HubResult<Value> + Send + Sync + 'static,
{
    Arc::new(FnHookTarget(f))
}

struct AsyncFnHookTarget<F>(F);

#[async_trait]
impl<F> HookTarget for AsyncFnHookTarget<F>
where
    F: Fn(Option<Value>, Vec<Value>) -> BoxFuture<'static, HubResult<Value>> + Send + Sync,
{
    async fn invoke(&self, ctx: Option<Value>, args: Vec<Value>) -> HubResult<Value> {
        (self.0)(ctx, args).await
    }
}

/// Wraps a future-returning closure as a [`HookTarget`].
pub fn async_target_fn<F>(f: F) -> Arc<dyn HookTarget>
where
    F: Fn(Option<Value>, Vec<Value>) -> BoxFuture<'static, HubResult<Value>> + Send + Sync + 'static,
{
    Arc::new(AsyncFnHookTarget(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_args_keeps_event() {
        let payload = Payload::new("upload", vec![json!(1), json!("a")]);
        let replaced = payload.with_args(vec![json!(2)]);
        assert_eq!(replaced.event, "upload");
        assert_eq!(replaced.args, vec![json!(2)]);
        assert!(replaced.hook.is_none());
    }

    #[tokio::test]
    async fn test_target_fn_invokes_closure() {
        let target = target_fn(|_ctx, args| Ok(json!(args.len())));
        let out = target.invoke(None, vec![json!(1), json!(2)]).await.unwrap();
        assert_eq!(out, json!(2));
    }

    #[tokio::test]
    async fn test_async_target_fn_sees_context() {
        use futures::FutureExt;

        let target = async_target_fn(|ctx, _args| {
            async move { Ok(ctx.unwrap_or(Value::Null)) }.boxed()
        });
        let out = target
            .invoke(Some(json!({ "admin": true })), vec![])
            .await
            .unwrap();
        assert_eq!(out, json!({ "admin": true }));
    }

    #[test]
    fn test_result_reads_hook_slot() {
        let target = target_fn(|_, _| Ok(Value::Null));
        let mut payload = Payload::hooked(
            "save",
            vec![],
            HookState {
                target,
                ctx: None,
                result: None,
            },
        );
        assert!(payload.result().is_none());
        if let Some(hook) = payload.hook.as_mut() {
            hook.result = Some(json!(42));
        }
        assert_eq!(payload.result(), Some(&json!(42)));
    }
}
