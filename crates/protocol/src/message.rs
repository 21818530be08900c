use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier correlating a request with its response.
pub type RequestId = u32;

/// Metadata a client may attach to a request.
///
/// The server accepts it for compatibility with clients that always send it,
/// but routing never depends on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Unix timestamp in milliseconds
    #[serde(rename = "wallTime", default, skip_serializing_if = "Option::is_none")]
    pub wall_time: Option<i64>,
    /// Whether this is an internal call (not user-facing API)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,
    /// Optional title for the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Client → server method call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request id echoed back in the response
    pub id: RequestId,
    /// Guid of the target object (format: "Type@hash", root is "")
    #[serde(
        serialize_with = "serialize_arc_str",
        deserialize_with = "deserialize_arc_str"
    )]
    pub guid: Arc<str>,
    /// Method name to invoke
    pub method: String,
    /// Raw parameters, validated against the target's scheme before use
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Serde helpers for `Arc<str>` serialization
pub fn serialize_arc_str<S>(arc: &Arc<str>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(arc)
}

pub fn deserialize_arc_str<'de, D>(deserializer: D) -> std::result::Result<Arc<str>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    Ok(Arc::from(s.as_str()))
}

/// Server → client answer to a [`Request`].
///
/// Exactly one of `result` and `error` is meaningful; a successful call that
/// returns nothing carries neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response correlates to
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl Response {
    pub fn success(id: RequestId, result: Option<Value>) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    pub fn failure(id: RequestId, error: ErrorPayload) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Serialized error details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error message
    pub message: String,
    /// Error type name (e.g., "Error", "ValidationError", "TargetClosedError")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Error trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Unsolicited server → client message targeted at a guid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(
        serialize_with = "serialize_arc_str",
        deserialize_with = "deserialize_arc_str"
    )]
    pub guid: Arc<str>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Discriminated union of outbound messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Response message (has `id` field)
    Response(Response),
    /// Event message (no `id` field)
    Event(Event),
}

/// Parameters of the reserved `__create__` announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParams {
    #[serde(rename = "type")]
    pub type_name: String,
    pub initializer: Value,
    pub guid: String,
}

/// Wire encoding of a live object reference: `{"guid": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub guid: String,
}

impl ObjectRef {
    /// Recognizes the reference-token shape inside an arbitrary value.
    pub fn from_value(value: &Value) -> Option<&str> {
        value.as_object()?.get("guid")?.as_str()
    }
}
