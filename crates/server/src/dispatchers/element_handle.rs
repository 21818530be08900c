use std::sync::{Arc, LazyLock};

use pw_dispatch_runtime::{Dispatcher, Error, MethodTable, Payload, Result};

use crate::domain::ElementHandle;

pub const ELEMENT_HANDLE_TYPE: &str = "ElementHandle";

static METHODS: LazyLock<Arc<MethodTable>> = LazyLock::new(|| {
    Arc::new(
        MethodTable::new()
            .method("textContent", text_content)
            .method("dispose", dispose),
    )
});

pub fn methods() -> Arc<MethodTable> {
    Arc::clone(&METHODS)
}

/// Fails with `TargetClosed` if `parent` was disposed meanwhile.
pub fn create(parent: &Arc<Dispatcher>, element: Arc<ElementHandle>) -> Result<Arc<Dispatcher>> {
    Dispatcher::builder(ELEMENT_HANDLE_TYPE)
        .initializer(Payload::object([("preview", element.preview())]))
        .methods(methods())
        .try_create(parent, element)
}

/// The live dispatcher already wrapping `element`, or a new one under `parent`.
pub fn from(parent: &Arc<Dispatcher>, element: Arc<ElementHandle>) -> Result<Arc<Dispatcher>> {
    match parent.connection().existing_dispatcher(&element) {
        Some(existing) => Ok(existing),
        None => create(parent, element),
    }
}

async fn text_content(node: Arc<Dispatcher>, _params: Payload) -> Result<Payload> {
    let element = node.object::<ElementHandle>()?;
    Ok(Payload::object([("value", element.text_content())]))
}

async fn dispose(node: Arc<Dispatcher>, _params: Payload) -> Result<Payload> {
    if !node.dispose_if_live() {
        return Err(Error::TargetClosed);
    }
    Ok(Payload::Null)
}
