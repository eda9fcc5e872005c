//! Process-wide handle lookup used to route backend callbacks.
//!
//! Backends never see the objects they report to. They carry a [`Handle`]
//! and every callback resolves it here. Entries are weak, so a registry entry
//! never keeps a context or stream alive, and a lookup that races with
//! disposal simply misses.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use crate::context::ContextShared;
use crate::handle::Handle;
use crate::outstream::StreamShared;

pub(crate) static CONTEXTS: Lazy<Registry<ContextShared>> = Lazy::new(Registry::new);
pub(crate) static STREAMS: Lazy<Registry<StreamShared>> = Lazy::new(Registry::new);

pub struct Registry<T> {
    entries: RwLock<HashMap<Handle, Weak<T>>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, handle: Handle, object: &Arc<T>) {
        self.entries.write().insert(handle, Arc::downgrade(object));
        trace!("Registered {handle}");
    }

    /// Remove `handle`. Returns whether it was present.
    pub fn deregister(&self, handle: Handle) -> bool {
        let removed = self.entries.write().remove(&handle).is_some();
        if removed {
            trace!("Deregistered {handle}");
        }
        removed
    }

    /// Resolve `handle` to a live object.
    pub fn lookup(&self, handle: Handle) -> Option<Arc<T>> {
        self.entries.read().get(&handle).and_then(Weak::upgrade)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.read().contains_key(&handle)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
