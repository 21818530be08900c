use std::sync::{Arc, LazyLock};

use pw_dispatch_runtime::{Dispatcher, EmitEvent, Error, MethodTable, Payload, Result};

use super::{element_handle, opt_str_param, str_param};
use crate::domain::BrowserContext;

pub const BROWSER_CONTEXT_TYPE: &str = "BrowserContext";

static METHODS: LazyLock<Arc<MethodTable>> = LazyLock::new(|| {
    Arc::new(
        MethodTable::new()
            .method("newElement", new_element)
            .method("querySelector", query_selector)
            .method("waitForTimeout", wait_for_timeout)
            .method("close", close),
    )
});

pub fn methods() -> Arc<MethodTable> {
    Arc::clone(&METHODS)
}

/// Contexts are scopes: closing one takes every element handle with it.
pub fn create(parent: &Arc<Dispatcher>, context: Arc<BrowserContext>) -> Result<Arc<Dispatcher>> {
    Dispatcher::builder(BROWSER_CONTEXT_TYPE)
        .scope()
        .initializer(Payload::object([("id", context.id())]))
        .methods(methods())
        .try_create(parent, context)
}

async fn new_element(node: Arc<Dispatcher>, params: Payload) -> Result<Payload> {
    let tag_name = str_param(&params, "tagName")?;
    let text = opt_str_param(&params, "text").map(str::to_string);
    let element = node.object::<BrowserContext>()?.new_element(tag_name, text)?;
    let element = element_handle::from(&node, element)?;
    Ok(Payload::object([("element", element)]))
}

async fn query_selector(node: Arc<Dispatcher>, params: Payload) -> Result<Payload> {
    let selector = str_param(&params, "selector")?;
    let element = node.object::<BrowserContext>()?.query_selector(selector)?;
    let element = element
        .map(|element| element_handle::from(&node, element))
        .transpose()?;
    Ok(Payload::object([("element", element)]))
}

async fn wait_for_timeout(node: Arc<Dispatcher>, params: Payload) -> Result<Payload> {
    let timeout = params
        .field("timeout")?
        .as_f64()
        .ok_or_else(|| Error::domain("timeout: expected number"))?;
    node.object::<BrowserContext>()?
        .wait_for_timeout(timeout)
        .await?;
    node.ensure_live()?;
    Ok(Payload::Null)
}

async fn close(node: Arc<Dispatcher>, _params: Payload) -> Result<Payload> {
    if !node.object::<BrowserContext>()?.close() {
        return Err(Error::TargetClosed);
    }
    node.emit_event("close", Payload::empty_object())?;
    if !node.dispose_if_live() {
        return Err(Error::TargetClosed);
    }
    Ok(Payload::Null)
}
