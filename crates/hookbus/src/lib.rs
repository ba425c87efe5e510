//! # hookbus
//!
//! Listener registration and dispatch engine. Provides:
//!
//! - Prioritized event listeners (`on` / `once` / `off`) with stable
//!   ordering and whitespace-separated multi-event registration
//! - A dispatch engine interleaving synchronous and asynchronous listeners
//!   in one chain, with an explicit at-most-once continuation (`Next`) and
//!   payload replacement at every stage
//! - Function hooks: wrap a call in an interception chain that can observe
//!   and rewrite its arguments and return value
//! - Links: federate one emitter's chains across other instances' listener
//!   registries, with optional event-name prefix remapping
//!
//! Chains are in-process only: there is no wire format, persistence, or
//! cross-process delivery, and a chain runs to completion or first error.
//!
//! ```
//! use hookbus::{Emitter, listener_fn};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hookbus::HubResult<()> {
//! let emitter = Emitter::new();
//! emitter.on("upload", listener_fn(|payload| {
//!     payload.args.push(json!("seen"));
//!     Ok(None)
//! }))?;
//!
//! let payload = emitter.emit("upload", vec![json!("report.pdf")])?.await?;
//! assert_eq!(payload.args, vec![json!("report.pdf"), json!("seen")]);
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod emitter;
pub mod hook;
mod link;
pub mod registry;

pub use dispatch::{ComposeOptions, Dispatch, Dispatcher, Next, Transform};
pub use emitter::Emitter;
pub use hook::{HookCall, Hooked};
pub use registry::{Listener, Registry, async_listener_fn, listener_fn};

// Re-export the foundation crate's surface for one-stop use.
pub use hookbus_core::{
    ErrorKind, HookState, HookTarget, HubError, HubResult, Payload, async_target_fn, target_fn,
};
