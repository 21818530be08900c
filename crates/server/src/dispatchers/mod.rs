//! Reference concrete dispatchers.
//!
//! Each submodule owns the method table for one protocol type and a
//! `create` function that wraps a domain object in a [`Dispatcher`] under a
//! given parent. Handlers receive params that already passed validation, so
//! a missing required field here means the schema and the table disagree.
//!
//! [`Dispatcher`]: pw_dispatch_runtime::Dispatcher

pub mod browser_context;
pub mod element_handle;
pub mod playwright;
pub mod selectors;

use pw_dispatch_runtime::{Error, Payload, Result};

pub use browser_context::BROWSER_CONTEXT_TYPE;
pub use element_handle::ELEMENT_HANDLE_TYPE;
pub use playwright::PLAYWRIGHT_TYPE;
pub use selectors::SELECTORS_TYPE;

/// Required string param.
pub(crate) fn str_param<'a>(params: &'a Payload, key: &str) -> Result<&'a str> {
    params
        .field(key)?
        .as_str()
        .ok_or_else(|| Error::domain(format!("{key}: expected string")))
}

/// Optional string param; absent keys were omitted by validation.
pub(crate) fn opt_str_param<'a>(params: &'a Payload, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Payload::as_str)
}
