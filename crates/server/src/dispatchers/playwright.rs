use std::sync::{Arc, LazyLock};

use pw_dispatch_runtime::{Dispatcher, MethodTable, Payload, Result};

use super::browser_context;
use crate::domain::Playwright;

pub const PLAYWRIGHT_TYPE: &str = "Playwright";

static METHODS: LazyLock<Arc<MethodTable>> =
    LazyLock::new(|| Arc::new(MethodTable::new().method("newContext", new_context)));

pub fn methods() -> Arc<MethodTable> {
    Arc::clone(&METHODS)
}

/// Wraps `playwright`; the initializer carries the `Selectors` reference so
/// the client can reach it without a round trip.
pub fn create(
    parent: &Arc<Dispatcher>,
    playwright: Arc<Playwright>,
    selectors: &Arc<Dispatcher>,
) -> Arc<Dispatcher> {
    Dispatcher::builder(PLAYWRIGHT_TYPE)
        .initializer(Payload::object([("selectors", selectors)]))
        .methods(methods())
        .create(parent, playwright)
}

async fn new_context(node: Arc<Dispatcher>, _params: Payload) -> Result<Payload> {
    let context = node.object::<Playwright>()?.new_context();
    let context = browser_context::create(&node, context)?;
    Ok(Payload::object([("context", context)]))
}
