//! Reference server for the object-dispatch protocol.
//!
//! Wires the runtime's [`Connection`](pw_dispatch_runtime::Connection) to a
//! stdio pipe transport, attaches the `Selectors` and `Playwright`
//! dispatchers under the root and shuts down gracefully when the client
//! disconnects.

pub mod cli;
pub mod config;
pub mod dispatchers;
pub mod domain;
pub mod logging;
pub mod schema;
pub mod server;

pub use config::ServerConfig;
pub use server::{Bootstrap, bootstrap, serve, serve_stdio};
