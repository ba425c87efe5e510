//! # hookbus-core
//!
//! Foundation crate for Hookbus. Contains the dispatch payload types, the
//! [`HookTarget`] contract for wrapped functions, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other Hookbus crates.

pub mod error;
pub mod payload;
pub mod result;

pub use error::{ErrorKind, HubError};
pub use payload::{HookState, HookTarget, Payload, async_target_fn, target_fn};
pub use result::HubResult;
