use std::sync::{Arc, LazyLock};

use pw_dispatch_runtime::{Dispatcher, MethodTable, Payload, Result};

use super::str_param;
use crate::domain::{ElementHandle, Selectors};

pub const SELECTORS_TYPE: &str = "Selectors";

static METHODS: LazyLock<Arc<MethodTable>> = LazyLock::new(|| {
    Arc::new(
        MethodTable::new()
            .method("register", register)
            .method("createSelector", create_selector),
    )
});

pub fn methods() -> Arc<MethodTable> {
    Arc::clone(&METHODS)
}

pub fn create(parent: &Arc<Dispatcher>, selectors: Arc<Selectors>) -> Arc<Dispatcher> {
    Dispatcher::builder(SELECTORS_TYPE)
        .methods(methods())
        .create(parent, selectors)
}

async fn register(node: Arc<Dispatcher>, params: Payload) -> Result<Payload> {
    let name = str_param(&params, "name")?;
    let source = str_param(&params, "source")?;
    let content_script = params
        .get("contentScript")
        .and_then(Payload::as_bool)
        .unwrap_or(false);
    node.object::<Selectors>()?
        .register(name, source, content_script)?;
    Ok(Payload::Null)
}

async fn create_selector(node: Arc<Dispatcher>, params: Payload) -> Result<Payload> {
    let name = str_param(&params, "name")?;
    let handle = params
        .field("handle")?
        .as_node()
        .ok_or(pw_dispatch_runtime::Error::NoDispatcher)?;
    let element = handle.object::<ElementHandle>()?;
    let value = node.object::<Selectors>()?.create_selector(name, &element)?;
    Ok(Payload::object([("value", value)]))
}
