use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::selectors::Selectors;
use super::{DomainError, Result};

/// Entry point object: owns the selector registry and every open context.
pub struct Playwright {
    selectors: Arc<Selectors>,
    contexts: Mutex<Vec<Arc<BrowserContext>>>,
    next_context_id: AtomicU64,
}

impl Playwright {
    pub fn new() -> Self {
        Self {
            selectors: Arc::new(Selectors::new()),
            contexts: Mutex::new(Vec::new()),
            next_context_id: AtomicU64::new(1),
        }
    }

    pub fn selectors(&self) -> &Arc<Selectors> {
        &self.selectors
    }

    pub fn new_context(&self) -> Arc<BrowserContext> {
        let id = self.next_context_id.fetch_add(1, Ordering::Relaxed);
        let context = Arc::new(BrowserContext::new(id));
        let mut contexts = self.contexts.lock();
        contexts.retain(|c| !c.is_closed());
        contexts.push(Arc::clone(&context));
        context
    }

    /// Contexts that have not been closed yet.
    pub fn open_contexts(&self) -> Vec<Arc<BrowserContext>> {
        self.contexts
            .lock()
            .iter()
            .filter(|c| !c.is_closed())
            .cloned()
            .collect()
    }

    /// Closes every open context; returns how many were still open.
    pub async fn close_all(&self) -> usize {
        let contexts = std::mem::take(&mut *self.contexts.lock());
        let mut closed = 0;
        for context in contexts {
            if context.close() {
                tracing::debug!(context = context.id(), "closed context during shutdown");
                closed += 1;
            }
            tokio::task::yield_now().await;
        }
        closed
    }
}

impl Default for Playwright {
    fn default() -> Self {
        Self::new()
    }
}

/// Isolated session holding a flat list of elements.
pub struct BrowserContext {
    id: u64,
    closed: AtomicBool,
    elements: Mutex<Vec<Arc<ElementHandle>>>,
}

impl BrowserContext {
    fn new(id: u64) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
            elements: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Marks the context closed; `false` if it already was.
    pub fn close(&self) -> bool {
        let was_open = !self.closed.swap(true, Ordering::SeqCst);
        if was_open {
            self.elements.lock().clear();
        }
        was_open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(DomainError::ContextClosed)
        } else {
            Ok(())
        }
    }

    pub fn new_element(&self, tag_name: &str, text: Option<String>) -> Result<Arc<ElementHandle>> {
        self.ensure_open()?;
        let element = Arc::new(ElementHandle::new(tag_name, text));
        self.elements.lock().push(Arc::clone(&element));
        Ok(element)
    }

    /// First element whose tag name matches `selector`, case-insensitively.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Arc<ElementHandle>>> {
        self.ensure_open()?;
        let wanted = selector.trim().to_ascii_lowercase();
        Ok(self
            .elements
            .lock()
            .iter()
            .find(|e| e.tag_name() == wanted)
            .cloned())
    }

    pub fn element_count(&self) -> usize {
        self.elements.lock().len()
    }

    /// Sleeps for `timeout_ms`, failing if the context closed meanwhile.
    pub async fn wait_for_timeout(&self, timeout_ms: f64) -> Result<()> {
        // Rejects negative values, NaN and anything `Duration` cannot hold.
        let duration = Duration::try_from_secs_f64(timeout_ms / 1000.0)
            .map_err(|_| DomainError::InvalidTimeout(timeout_ms))?;
        self.ensure_open()?;
        tokio::time::sleep(duration).await;
        self.ensure_open()
    }
}

/// A single element: a lowercase tag name and optional text content.
#[derive(Debug)]
pub struct ElementHandle {
    tag_name: String,
    text: Option<String>,
}

impl ElementHandle {
    pub fn new(tag_name: &str, text: Option<String>) -> Self {
        Self {
            tag_name: tag_name.trim().to_ascii_lowercase(),
            text,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Short markup rendering, e.g. `<button>OK</button>`.
    pub fn preview(&self) -> String {
        format!(
            "<{tag}>{text}</{tag}>",
            tag = self.tag_name,
            text = self.text.as_deref().unwrap_or_default()
        )
    }
}
