//! Dispatch Runtime - server side of the object-dispatch protocol
//!
//! This crate exposes server-side domain objects to a remote client over a
//! message channel:
//!
//! - **Dispatchers**: Remotely addressable proxies organised in a scope tree
//! - **Connection**: Guid registry, request routing and response encoding
//! - **Validation**: Per-method param schemes that resolve `{guid}` references
//! - **Transport**: Length-prefixed JSON over a pair of byte streams
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  pw-dispatch │  Domain dispatchers (Playwright, Selectors, ...)
//! │    server    │
//! └──────┬───────┘
//!        │ registers MethodTables, creates Dispatchers
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  Routing, registry, outbound queue
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Valid  │  │  Schema and reference resolution
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Pipe transport
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod transport;
pub mod validator;

// Re-export key types at crate root
pub use connection::{Connection, ObjectKey};
pub use dispatcher::{
    Dispatcher, DispatcherBuilder, DomainObject, EmitEvent, MethodFn, MethodFuture, MethodTable,
    ParentOrConnection, ROOT_TYPE, Root,
};
pub use error::{Error, Result};
pub use payload::Payload;
pub use transport::{
    PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts,
    TransportReceiver,
};
pub use validator::{ANY_CHANNEL, ChannelResolver, Scheme, Schema, ValidationError};
