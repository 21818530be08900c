//! Wire types for the object-dispatch protocol.
//!
//! Every message is a JSON record. Clients send [`Request`]s addressed to a
//! guid; the server answers each one with a [`Response`] carrying the same id
//! and pushes unsolicited [`Event`]s (including the reserved `__create__` and
//! `__dispose__` announcements) targeted at guids.

mod message;

pub use message::{
    CreateParams, ErrorPayload, Event, Message, Metadata, ObjectRef, Request, RequestId, Response,
    deserialize_arc_str, serialize_arc_str,
};

/// Reserved method announcing a new object under its parent's guid.
pub const CREATE_METHOD: &str = "__create__";

/// Reserved method announcing that a scope object and its subtree are gone.
pub const DISPOSE_METHOD: &str = "__dispose__";

/// Inbound-only diagnostic method returning the object tree dump.
pub const DEBUG_SCOPE_STATE_METHOD: &str = "debugScopeState";

/// Guid of the root scope on every connection.
pub const ROOT_GUID: &str = "";
