//! Per-type method tables.
//!
//! A [`MethodTable`] maps protocol method names to async handlers. Every
//! dispatcher of a given type shares one table; the router looks the handler
//! up by name after the params passed validation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::Dispatcher;
use crate::error::Result;
use crate::payload::Payload;

/// Boxed handler future.
pub type MethodFuture = BoxFuture<'static, Result<Payload>>;

/// Handler function: (target dispatcher, validated params) → async result.
pub type MethodFn = Arc<dyn Fn(Arc<Dispatcher>, Payload) -> MethodFuture + Send + Sync>;

#[derive(Clone, Default)]
pub struct MethodTable {
    handlers: HashMap<&'static str, MethodFn>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous one.
    pub fn method<F, Fut>(mut self, name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<Dispatcher>, Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        let boxed: MethodFn = Arc::new(move |node: Arc<Dispatcher>, params: Payload| -> MethodFuture {
            Box::pin(handler(node, params))
        });
        self.handlers.insert(name, boxed);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MethodFn> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered method names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
