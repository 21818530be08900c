//! Dispatcher - the remotely addressable proxy for one domain object.
//!
//! Dispatchers form a tree. Every dispatcher is registered in the
//! connection's global guid registry and in its parent's children map from
//! creation until disposal. Scope dispatchers announce their own disposal to
//! the client; everything else disappears silently with its scope.
//!
//! Creation sends `__create__` to the parent's guid. Disposal detaches the
//! dispatcher, disposes its children depth-first and, for scopes only, sends
//! `__dispose__` once the whole subtree is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use downcast_rs::{DowncastSync, impl_downcast};
use indexmap::IndexMap;
use parking_lot::Mutex;
use pw_dispatch_protocol::{CREATE_METHOD, CreateParams, DISPOSE_METHOD, ROOT_GUID};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::connection::{Connection, ObjectKey};
use crate::error::{Error, Result};
use crate::payload::Payload;

mod methods;
mod root;

pub use methods::{MethodFn, MethodFuture, MethodTable};
pub use root::{ROOT_TYPE, Root};
pub(crate) use root::create_root;

/// Domain value wrapped by a dispatcher.
///
/// Implemented for every `Send + Sync + 'static` type; handlers get their
/// concrete type back with [`Dispatcher::object`].
pub trait DomainObject: DowncastSync {}

impl<T: std::any::Any + Send + Sync> DomainObject for T {}

impl_downcast!(sync DomainObject);

/// Children keyed by guid, in creation order.
pub(crate) type ChildrenRegistry = IndexMap<Arc<str>, Arc<Dispatcher>>;

/// Parent can be either another Dispatcher or the Connection itself (root only).
pub enum ParentOrConnection {
    Parent(Arc<Dispatcher>),
    Connection(Arc<Connection>),
}

impl From<Arc<Dispatcher>> for ParentOrConnection {
    fn from(parent: Arc<Dispatcher>) -> Self {
        ParentOrConnection::Parent(parent)
    }
}

impl From<&Arc<Dispatcher>> for ParentOrConnection {
    fn from(parent: &Arc<Dispatcher>) -> Self {
        ParentOrConnection::Parent(Arc::clone(parent))
    }
}

/// Capability to push unsolicited messages to the client.
pub trait EmitEvent {
    /// Sends `{guid, method, params}` targeted at this object's own guid.
    fn emit_event(&self, method: &str, params: Payload) -> Result<()>;
}

pub struct Dispatcher {
    guid: Arc<str>,
    type_name: Arc<str>,
    is_scope: bool,
    connection: Arc<Connection>,
    parent: Option<Weak<Dispatcher>>,
    scope: Weak<Dispatcher>,
    pub(crate) children: Mutex<ChildrenRegistry>,
    object: Arc<dyn DomainObject>,
    methods: Arc<MethodTable>,
    disposed: AtomicBool,
}

/// Options for creating a [`Dispatcher`].
pub struct DispatcherBuilder {
    type_name: String,
    initializer: Payload,
    is_scope: bool,
    guid: Option<String>,
    methods: Arc<MethodTable>,
}

impl DispatcherBuilder {
    /// Makes the dispatcher a scope: it owns children and announces its disposal.
    pub fn scope(mut self) -> Self {
        self.is_scope = true;
        self
    }

    pub fn initializer(mut self, initializer: impl Into<Payload>) -> Self {
        self.initializer = initializer.into();
        self
    }

    /// Overrides the default `<type>@<random>` guid.
    pub fn guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn methods(mut self, methods: Arc<MethodTable>) -> Self {
        self.methods = methods;
        self
    }

    /// Registers the dispatcher and announces it to the client.
    ///
    /// # Panics
    ///
    /// On protocol-invariant violations: a guid already registered on the
    /// connection or in the parent, a disposed parent, a parentless
    /// non-scope dispatcher, or a dispatcher reference inside a scope's
    /// initializer.
    pub fn create<T: DomainObject>(
        self,
        parent: impl Into<ParentOrConnection>,
        object: Arc<T>,
    ) -> Arc<Dispatcher> {
        let parent = parent.into();
        let parent_guid = match &parent {
            ParentOrConnection::Parent(parent) => Arc::clone(&parent.guid),
            ParentOrConnection::Connection(_) => Arc::from(ROOT_GUID),
        };
        let type_name = self.type_name.clone();
        match self.try_create(parent, object) {
            Ok(node) => node,
            Err(e) => panic!("cannot create {type_name:?} under disposed dispatcher {parent_guid}: {e}"),
        }
    }

    /// Like [`create`](Self::create), but a parent disposed concurrently is
    /// [`Error::TargetClosed`] instead of a panic.
    ///
    /// Handlers creating children after their own target may have been
    /// disposed by another call use this. The disposal check and the
    /// registration are atomic, so the child is either refused or reached
    /// by the parent's dispose cascade.
    pub fn try_create<T: DomainObject>(
        self,
        parent: impl Into<ParentOrConnection>,
        object: Arc<T>,
    ) -> Result<Arc<Dispatcher>> {
        let DispatcherBuilder {
            type_name,
            initializer,
            is_scope,
            guid,
            methods,
        } = self;

        let (connection, parent) = match parent.into() {
            ParentOrConnection::Parent(parent) => (Arc::clone(parent.connection()), Some(parent)),
            ParentOrConnection::Connection(connection) => (connection, None),
        };
        assert!(
            parent.is_some() || is_scope,
            "dispatcher of type {type_name:?} without a parent must be a scope"
        );
        if let Some(parent) = &parent {
            parent.ensure_live()?;
        }

        let guid: Arc<str> = Arc::from(
            guid.unwrap_or_else(|| format!("{type_name}@{}", Uuid::new_v4().simple()))
                .as_str(),
        );

        // Scope initializers reach the client before any child exists there,
        // so they cannot carry references.
        let announcement = match &parent {
            Some(_) => Some(
                initializer
                    .encode(!is_scope)
                    .unwrap_or_else(|e| panic!("cannot announce {guid}: {e}")),
            ),
            None => None,
        };

        let object: Arc<dyn DomainObject> = object;
        let parent_scope = parent.as_ref().map(|p| p.scope.clone());
        let node = Arc::new_cyclic(|this: &Weak<Dispatcher>| Dispatcher {
            guid: Arc::clone(&guid),
            type_name: Arc::from(type_name.as_str()),
            is_scope,
            connection: Arc::clone(&connection),
            parent: parent.as_ref().map(Arc::downgrade),
            scope: if is_scope {
                this.clone()
            } else {
                parent_scope.unwrap_or_default()
            },
            children: Mutex::new(IndexMap::new()),
            object,
            methods,
            disposed: AtomicBool::new(false),
        });

        // `__create__` is queued while the registry is locked, so it always
        // precedes the parent's `__dispose__`.
        connection.store().register(&node, parent.as_ref(), || {
            let (Some(parent), Some(initializer)) = (&parent, announcement) else {
                return;
            };
            let params = CreateParams {
                type_name: type_name.clone(),
                initializer,
                guid: guid.to_string(),
            };
            let sent = serde_json::to_value(params)
                .map_err(Error::from)
                .and_then(|params| connection.send_event(&parent.guid, CREATE_METHOD, params));
            if let Err(e) = sent {
                tracing::debug!(guid = %guid, "__create__ not delivered: {}", e);
            }
        })?;
        tracing::debug!(guid = %guid, type_name = %type_name, is_scope, "created dispatcher");

        Ok(node)
    }
}

impl Dispatcher {
    /// Starts building a dispatcher of protocol type `type_name`.
    pub fn builder(type_name: impl Into<String>) -> DispatcherBuilder {
        DispatcherBuilder {
            type_name: type_name.into(),
            initializer: Payload::empty_object(),
            is_scope: false,
            guid: None,
            methods: Arc::new(MethodTable::new()),
        }
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    /// Protocol type name, the first half of every scheme lookup.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_scope(&self) -> bool {
        self.is_scope
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn parent(&self) -> Option<Arc<Dispatcher>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Nearest scope, inclusive of self.
    pub fn scope(&self) -> Option<Arc<Dispatcher>> {
        self.scope.upgrade()
    }

    /// Snapshot of the live children in creation order.
    pub fn children(&self) -> Vec<Arc<Dispatcher>> {
        self.children.lock().values().cloned().collect()
    }

    /// Returns the wrapped domain object as `T`.
    pub fn object<T: DomainObject>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.object)
            .downcast_arc::<T>()
            .map_err(|_| Error::UnexpectedObject {
                guid: self.guid.to_string(),
                type_name: self.type_name.to_string(),
            })
    }

    pub(crate) fn object_key(&self) -> ObjectKey {
        ObjectKey::of(&self.object)
    }

    /// Fails with [`Error::TargetClosed`] once disposed.
    ///
    /// Handlers call this after suspending: the dispatcher may have been
    /// disposed by an unrelated call in the meantime.
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::TargetClosed)
        } else {
            Ok(())
        }
    }

    /// Starts the handler for `method` with already-validated params.
    pub fn invoke(self: &Arc<Self>, method: &str, params: Payload) -> Result<MethodFuture> {
        let handler = self
            .methods
            .get(method)
            .ok_or_else(|| Error::UnknownMethod {
                type_name: self.type_name.to_string(),
                method: method.to_string(),
            })?;
        Ok(handler(Arc::clone(self), params))
    }

    /// Disposes this dispatcher and all children recursively.
    ///
    /// # Panics
    ///
    /// If the dispatcher was already disposed.
    pub fn dispose(self: &Arc<Self>) {
        let already = self.disposed.swap(true, Ordering::SeqCst);
        assert!(
            !already,
            "dispatcher {} ({}) disposed twice",
            self.guid, self.type_name
        );
        self.tear_down();
    }

    /// Disposes unless already disposed; returns whether this call did it.
    ///
    /// For handlers whose target may be disposed concurrently by its scope.
    pub fn dispose_if_live(self: &Arc<Self>) -> bool {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.tear_down();
        true
    }

    fn tear_down(self: &Arc<Self>) {
        self.connection.store().unregister(self);

        let children: Vec<_> = {
            let guard = self.children.lock();
            guard.values().cloned().collect()
        };

        // A child may be disposing itself on another task.
        for child in children {
            child.dispose_if_live();
        }

        self.children.lock().clear();

        if self.is_scope {
            let sent = self
                .connection
                .send_event(&self.guid, DISPOSE_METHOD, json!({}));
            if let Err(e) = sent {
                tracing::debug!(guid = %self.guid, "__dispose__ not delivered: {}", e);
            }
        }
        tracing::debug!(guid = %self.guid, is_scope = self.is_scope, "disposed dispatcher");
    }

    /// `{guid, children: [...]}` for this subtree.
    pub fn debug_state(&self) -> Value {
        let children: Vec<Value> = self
            .children()
            .iter()
            .map(|child| child.debug_state())
            .collect();
        json!({
            "guid": &*self.guid,
            "children": children,
        })
    }
}

impl EmitEvent for Dispatcher {
    fn emit_event(&self, method: &str, params: Payload) -> Result<()> {
        self.ensure_live()?;
        self.connection
            .send_message_to_client(&self.guid, method, &params, false)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("guid", &self.guid)
            .field("type_name", &self.type_name)
            .field("is_scope", &self.is_scope)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
