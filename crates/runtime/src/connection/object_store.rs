//! Dispatcher registry and the object → dispatcher side table.
//!
//! The guid registry sits behind one [`Mutex`]; registration and removal
//! update it together with the parent's children map while the lock is held,
//! so no reader ever sees a dispatcher in one map and not the other. The side
//! table uses [`DashMap`] keyed by object identity.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Identity of a domain object: the address of its `Arc` allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    pub fn of<T: ?Sized>(object: &Arc<T>) -> Self {
        Self(Arc::as_ptr(object).cast::<()>() as usize)
    }
}

/// Registry of live dispatchers by guid, plus reverse lookup by object.
#[derive(Default)]
pub(crate) struct ObjectStore {
    dispatchers: Mutex<HashMap<Arc<str>, Arc<Dispatcher>>>,
    objects: DashMap<ObjectKey, Weak<Dispatcher>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node` into the registry and into `parent`'s children, then
    /// runs `announce` before releasing the registry lock.
    ///
    /// A parent disposed before the lock was taken is
    /// [`Error::TargetClosed`](crate::Error::TargetClosed). Disposal
    /// unregisters the parent under the same lock before it snapshots its
    /// children, so a node registered here is always part of that snapshot.
    ///
    /// # Panics
    ///
    /// If the guid is already registered in either map.
    pub fn register(
        &self,
        node: &Arc<Dispatcher>,
        parent: Option<&Arc<Dispatcher>>,
        announce: impl FnOnce(),
    ) -> Result<()> {
        let guid: Arc<str> = Arc::from(node.guid());
        let mut dispatchers = self.dispatchers.lock();
        if let Some(parent) = parent {
            parent.ensure_live()?;
        }
        assert!(
            !dispatchers.contains_key(&guid),
            "duplicate guid {guid:?} on connection"
        );

        if let Some(parent) = parent {
            let mut children = parent.children.lock();
            assert!(
                !children.contains_key(&guid),
                "duplicate guid {guid:?} in parent {}",
                parent.guid()
            );
            children.insert(Arc::clone(&guid), Arc::clone(node));
        }
        dispatchers.insert(guid, Arc::clone(node));
        self.objects.insert(node.object_key(), Arc::downgrade(node));
        announce();
        Ok(())
    }

    /// Removes `node` from the registry, its parent and the side table.
    pub fn unregister(&self, node: &Arc<Dispatcher>) {
        let mut dispatchers = self.dispatchers.lock();
        if let Some(parent) = node.parent() {
            parent.children.lock().shift_remove(node.guid());
        }
        dispatchers.remove(node.guid());
        drop(dispatchers);

        // The object may have been re-wrapped by a newer dispatcher.
        self.objects
            .remove_if(&node.object_key(), |_, owner| owner.as_ptr() == Arc::as_ptr(node));
    }

    /// Synchronous lookup.
    pub fn get(&self, guid: &str) -> Option<Arc<Dispatcher>> {
        self.dispatchers.lock().get(guid).cloned()
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.dispatchers.lock().contains_key(guid)
    }

    pub fn len(&self) -> usize {
        self.dispatchers.lock().len()
    }

    pub fn dispatcher_for(&self, key: ObjectKey) -> Option<Arc<Dispatcher>> {
        self.objects
            .get(&key)
            .and_then(|owner| owner.value().upgrade())
            .filter(|node| !node.is_disposed())
    }

    /// Drops every entry without disposing anything; returns how many
    /// dispatchers were registered.
    pub fn clear(&self) -> usize {
        let dispatchers = std::mem::take(&mut *self.dispatchers.lock());
        self.objects.clear();
        dispatchers.len()
    }
}
