//! Error types for the dispatch runtime.

use std::error::Error as StdError;

use pw_dispatch_protocol::ErrorPayload;
use thiserror::Error;

use crate::validator::ValidationError;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while routing and executing protocol calls.
#[derive(Debug, Error)]
pub enum Error {
    /// Request addressed a guid with no live dispatcher.
    #[error("Target browser or context has been closed")]
    TargetClosed,

    /// Params did not satisfy the method's scheme.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Scheme exists but the dispatcher type has no handler for the method.
    #[error("{type_name}.{method} is not implemented")]
    UnknownMethod { type_name: String, method: String },

    /// Failure reported by the domain object behind a dispatcher.
    #[error("{message}")]
    Domain { name: String, message: String },

    /// A dispatcher reference was embedded where the client cannot resolve it yet.
    #[error("Channels are not allowed in the scope's initializer")]
    NodeRefNotAllowed,

    /// Payload referenced a dispatcher that has already been disposed.
    #[error("Object with guid {guid} has been disposed")]
    DisposedReference { guid: String },

    /// Dispatcher wraps a different domain type than the handler expected.
    #[error("Object {guid} of type {type_name} does not wrap the expected domain object")]
    UnexpectedObject { guid: String, type_name: String },

    /// Domain object has no dispatcher registered on this connection.
    #[error("No dispatcher registered for domain object")]
    NoDispatcher,

    /// Outbound channel closed unexpectedly.
    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    /// Transport-level error (framing, pipe I/O).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Inbound message was not a well-formed request.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a generic domain failure.
    pub fn domain(message: impl Into<String>) -> Self {
        Error::Domain {
            name: "Error".to_string(),
            message: message.into(),
        }
    }

    /// Error type name reported to clients.
    pub fn error_name(&self) -> &str {
        match self {
            Error::TargetClosed | Error::DisposedReference { .. } => "TargetClosedError",
            Error::Validation(_) => "ValidationError",
            Error::Domain { name, .. } => name,
            _ => "Error",
        }
    }

    /// Returns true if this is a target closed error.
    pub fn is_target_closed(&self) -> bool {
        matches!(self, Error::TargetClosed | Error::DisposedReference { .. })
    }

    /// Serializes the error for an `{id, error}` response.
    ///
    /// The stack is the name/message line followed by one line per source.
    pub fn to_payload(&self) -> ErrorPayload {
        let message = self.to_string();
        let mut stack = format!("{}: {}", self.error_name(), message);
        let mut source = self.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }

        ErrorPayload {
            message,
            name: Some(self.error_name().to_string()),
            stack: Some(stack),
        }
    }
}
