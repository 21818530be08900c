//! In-memory domain objects behind the reference dispatchers.
//!
//! These stand in for a real browser engine: they hold just enough state to
//! give every protocol method observable behaviour.

mod browser;
mod selectors;

use thiserror::Error;

pub use browser::{BrowserContext, ElementHandle, Playwright};
pub use selectors::{BUILTIN_ENGINES, SelectorEngine, Selectors};

pub type Result<T> = std::result::Result<T, DomainError>;

/// Failures raised by domain operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Selector engine name may only contain [a-zA-Z0-9_-] characters")]
    InvalidEngineName,

    #[error("\"{0}\" is a predefined selector engine")]
    PredefinedEngine(String),

    #[error("\"{0}\" selector engine has been already registered")]
    DuplicateEngine(String),

    #[error("Unknown selector engine \"{0}\"")]
    UnknownEngine(String),

    #[error("Browser context has been closed")]
    ContextClosed,

    #[error("Timeout must be a non-negative number of milliseconds, got {0}")]
    InvalidTimeout(f64),
}

impl DomainError {
    /// Error name reported to clients.
    pub fn name(&self) -> &'static str {
        match self {
            DomainError::ContextClosed => "TargetClosedError",
            _ => "Error",
        }
    }
}

impl From<DomainError> for pw_dispatch_runtime::Error {
    fn from(err: DomainError) -> Self {
        pw_dispatch_runtime::Error::Domain {
            name: err.name().to_string(),
            message: err.to_string(),
        }
    }
}
