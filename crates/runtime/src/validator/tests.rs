use serde_json::json;

use super::*;
use crate::connection::Connection;

fn connection_with_page() -> (Arc<Connection>, Arc<Dispatcher>) {
    let connection = Connection::new(Schema::new());
    let root = connection.root().unwrap();
    let page = Dispatcher::builder("Page")
        .guid("page@1")
        .create(&root, Arc::new(()));
    (connection, page)
}

fn validate(scheme: &Scheme, value: Value) -> Result<Payload, ValidationError> {
    let (connection, _page) = connection_with_page();
    scheme
        .validate(Some(&value), "", connection.as_ref())
        .map(Option::unwrap_or_default)
}

#[test]
fn test_scheme_name_capitalizes_method() {
    assert_eq!(
        Schema::scheme_name("Selectors", "createSelector"),
        "SelectorsCreateSelectorParams"
    );
    assert_eq!(Schema::scheme_name("", "debug"), "DebugParams");
    assert_eq!(Schema::scheme_name("Page", ""), "PageParams");
}

#[test]
fn test_primitive_mismatch_names_path_and_kind() {
    let scheme = Scheme::object([("tagName", Scheme::String)]);
    let err = validate(&scheme, json!({"tagName": 42})).unwrap_err();
    assert_eq!(err.message(), "tagName: expected string, got number");

    let err = validate(&scheme, json!({})).unwrap_err();
    assert_eq!(err.message(), "tagName: expected string, got undefined");

    let err = validate(&Scheme::Number, json!(null)).unwrap_err();
    assert_eq!(err.message(), "expected number, got null");
}

#[test]
fn test_unknown_keys_dropped_and_absent_optionals_omitted() {
    let scheme = Scheme::object([
        ("name", Scheme::String),
        ("contentScript", Scheme::optional(Scheme::Boolean)),
    ]);
    let payload = validate(&scheme, json!({"name": "tag", "extra": 1})).unwrap();
    assert_eq!(payload.encode(true).unwrap(), json!({"name": "tag"}));
}

#[test]
fn test_nested_paths() {
    let scheme = Scheme::object([(
        "options",
        Scheme::object([("items", Scheme::array(Scheme::Number))]),
    )]);
    let err = validate(&scheme, json!({"options": {"items": [1, "two"]}})).unwrap_err();
    assert_eq!(err.message(), "options.items[1]: expected number, got string");
}

#[test]
fn test_enum() {
    let scheme = Scheme::enumeration(["load", "domcontentloaded"]);
    assert_eq!(validate(&scheme, json!("load")).unwrap().as_str(), Some("load"));
    let err = validate(&scheme, json!("idle")).unwrap_err();
    assert_eq!(err.message(), "expected one of (load|domcontentloaded)");
}

#[test]
fn test_binary_requires_base64() {
    assert!(validate(&Scheme::Binary, json!("aGVsbG8=")).is_ok());
    let err = validate(&Scheme::Binary, json!("not base64!")).unwrap_err();
    assert_eq!(err.message(), "expected base64-encoded buffer, got string");
}

#[test]
fn test_any_passes_through() {
    let payload = validate(&Scheme::Any, json!({"a": [1, null]})).unwrap();
    assert_eq!(payload.encode(false).unwrap(), json!({"a": [1, null]}));
}

#[test]
fn test_channel_resolves_live_dispatcher() {
    let (connection, page) = connection_with_page();
    let scheme = Scheme::object([("page", Scheme::channel("Page"))]);
    let payload = scheme
        .validate(Some(&json!({"page": {"guid": "page@1"}})), "", connection.as_ref())
        .unwrap()
        .unwrap();
    let resolved = payload.get("page").and_then(Payload::as_node).unwrap();
    assert!(Arc::ptr_eq(resolved, &page));
}

#[test]
fn test_channel_errors() {
    let (connection, _page) = connection_with_page();
    let scheme = Scheme::object([("frame", Scheme::channel("Frame"))]);

    let err = scheme
        .validate(Some(&json!({"frame": "page@1"})), "", connection.as_ref())
        .unwrap_err();
    assert_eq!(err.message(), "frame: expected Frame");

    let err = scheme
        .validate(Some(&json!({"frame": {"guid": "gone@9"}})), "", connection.as_ref())
        .unwrap_err();
    assert_eq!(err.message(), "frame: no object with guid gone@9");

    let err = scheme
        .validate(Some(&json!({"frame": {"guid": "page@1"}})), "", connection.as_ref())
        .unwrap_err();
    assert_eq!(
        err.message(),
        "frame: object with guid page@1 has type Page, expected Frame"
    );
}

#[test]
fn test_any_channel_accepts_every_type() {
    let (connection, _page) = connection_with_page();
    let scheme = Scheme::channel(ANY_CHANNEL);
    let payload = scheme
        .validate(Some(&json!({"guid": "page@1"})), "", connection.as_ref())
        .unwrap()
        .unwrap();
    assert_eq!(payload.as_node().unwrap().type_name(), "Page");
}

#[test]
fn test_disposed_dispatcher_no_longer_resolves() {
    let (connection, page) = connection_with_page();
    page.dispose();
    let err = Scheme::channel("Page")
        .validate(Some(&json!({"guid": "page@1"})), "", connection.as_ref())
        .unwrap_err();
    assert_eq!(err.message(), "no object with guid page@1");
}

#[test]
fn test_validate_params_unknown_scheme() {
    let (connection, _page) = connection_with_page();
    let schema = Schema::new();
    let err = schema
        .validate_params("Page", "goto", &json!({}), connection.as_ref())
        .unwrap_err();
    assert_eq!(err.message(), "Unknown scheme for Page.goto");
}

#[test]
fn test_validate_params_null_is_empty_object() {
    let (connection, _page) = connection_with_page();
    let schema = Schema::new().with("PageCloseParams", Scheme::empty_object());
    let payload = schema
        .validate_params("Page", "close", &Value::Null, connection.as_ref())
        .unwrap();
    assert_eq!(payload.encode(true).unwrap(), json!({}));
}

#[test]
fn test_schema_deserializes_from_json() {
    let schema: Schema = serde_json::from_value(json!({
        "ElementHandleTextContentParams": {"type": "object"},
        "SelectorsCreateSelectorParams": {
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "handle": {"type": "channel", "name": "ElementHandle"},
                "strict": {"type": "optional", "of": {"type": "boolean"}}
            }
        }
    }))
    .unwrap();

    assert_eq!(schema.len(), 2);
    assert_eq!(
        schema.get("SelectorsCreateSelectorParams"),
        Some(&Scheme::object([
            ("name", Scheme::String),
            ("handle", Scheme::channel("ElementHandle")),
            ("strict", Scheme::optional(Scheme::Boolean)),
        ]))
    );
    assert_eq!(
        schema.get("ElementHandleTextContentParams"),
        Some(&Scheme::empty_object())
    );
}

#[test]
fn test_extend_overrides_by_name() {
    let mut schema = Schema::new()
        .with("PageCloseParams", Scheme::empty_object())
        .with("PageGotoParams", Scheme::object([("url", Scheme::String)]));
    schema.extend(Schema::new().with("PageGotoParams", Scheme::Any));
    assert_eq!(schema.len(), 2);
    assert_eq!(schema.get("PageGotoParams"), Some(&Scheme::Any));
}
