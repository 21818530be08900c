use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex_lite::Regex;

use super::browser::ElementHandle;
use super::{DomainError, Result};

static ENGINE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z_0-9-]+$").unwrap());

/// Engines every client gets without registering anything.
pub const BUILTIN_ENGINES: &[&str] = &[
    "css",
    "css:light",
    "xpath",
    "xpath:light",
    "text",
    "text:light",
    "id",
    "id:light",
    "data-testid",
    "data-testid:light",
    "data-test-id",
    "data-test-id:light",
    "data-test",
    "data-test:light",
];

/// A custom engine registered by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEngine {
    pub source: String,
    pub content_script: bool,
}

/// Registry of selector engines.
#[derive(Default)]
pub struct Selectors {
    engines: Mutex<HashMap<String, SelectorEngine>>,
}

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, source: &str, content_script: bool) -> Result<()> {
        if !ENGINE_NAME_RE.is_match(name) {
            return Err(DomainError::InvalidEngineName);
        }
        if BUILTIN_ENGINES.contains(&name) {
            return Err(DomainError::PredefinedEngine(name.to_string()));
        }

        let mut engines = self.engines.lock();
        if engines.contains_key(name) {
            return Err(DomainError::DuplicateEngine(name.to_string()));
        }
        engines.insert(
            name.to_string(),
            SelectorEngine {
                source: source.to_string(),
                content_script,
            },
        );
        tracing::debug!(name, content_script, "registered selector engine");
        Ok(())
    }

    pub fn engine(&self, name: &str) -> Option<SelectorEngine> {
        self.engines.lock().get(name).cloned()
    }

    /// Builds a selector for `element` in the syntax of engine `name`.
    pub fn create_selector(&self, name: &str, element: &ElementHandle) -> Result<String> {
        let base = name.strip_suffix(":light").unwrap_or(name);
        let tag = element.tag_name();
        let body = match base {
            "css" => tag.to_string(),
            "xpath" => format!("//{tag}"),
            "text" => match element.text_content() {
                Some(text) => format!("{text:?}"),
                None => String::new(),
            },
            "id" | "data-testid" | "data-test-id" | "data-test" => tag.to_string(),
            custom if self.engines.lock().contains_key(custom) => tag.to_string(),
            _ => return Err(DomainError::UnknownEngine(name.to_string())),
        };
        Ok(format!("{name}={body}"))
    }
}
