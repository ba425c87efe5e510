//! Result alias used across the engine.

use crate::error::HubError;

/// Shorthand for results carrying a [`HubError`].
pub type HubResult<T> = Result<T, HubError>;
