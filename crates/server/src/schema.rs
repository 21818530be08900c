//! Built-in params schemes for the reference dispatchers.

use pw_dispatch_runtime::{Scheme, Schema};

use crate::dispatchers::{
    BROWSER_CONTEXT_TYPE, ELEMENT_HANDLE_TYPE, PLAYWRIGHT_TYPE, SELECTORS_TYPE,
};

/// Schema covering every method the reference dispatchers implement.
pub fn protocol_schema() -> Schema {
    let name = Schema::scheme_name;
    Schema::new()
        .with(name(PLAYWRIGHT_TYPE, "newContext"), Scheme::empty_object())
        .with(
            name(BROWSER_CONTEXT_TYPE, "newElement"),
            Scheme::object([
                ("tagName", Scheme::String),
                ("text", Scheme::optional(Scheme::String)),
            ]),
        )
        .with(
            name(BROWSER_CONTEXT_TYPE, "querySelector"),
            Scheme::object([("selector", Scheme::String)]),
        )
        .with(
            name(BROWSER_CONTEXT_TYPE, "waitForTimeout"),
            Scheme::object([("timeout", Scheme::Number)]),
        )
        .with(name(BROWSER_CONTEXT_TYPE, "close"), Scheme::empty_object())
        .with(name(ELEMENT_HANDLE_TYPE, "textContent"), Scheme::empty_object())
        .with(name(ELEMENT_HANDLE_TYPE, "dispose"), Scheme::empty_object())
        .with(
            name(SELECTORS_TYPE, "register"),
            Scheme::object([
                ("name", Scheme::String),
                ("source", Scheme::String),
                ("contentScript", Scheme::optional(Scheme::Boolean)),
            ]),
        )
        .with(
            name(SELECTORS_TYPE, "createSelector"),
            Scheme::object([
                ("name", Scheme::String),
                ("handle", Scheme::channel(ELEMENT_HANDLE_TYPE)),
            ]),
        )
}
