//! Resource identity and disposal notification
//!
//! GPU-side caches key their entries by [`ResourceId`] and learn about
//! destruction through [`Disposal`] callbacks, so they never hold a strong
//! reference to the source resource.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a geometry, texture or instance set.
/// Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type DisposeCallback = Box<dyn FnOnce(ResourceId)>;

/// One-shot disposal signal carried by a resource.
///
/// Callbacks run exactly once: on the first explicit [`Disposal::dispose`]
/// or when the owner is dropped, whichever comes first.
pub struct Disposal {
    id: ResourceId,
    disposed: Cell<bool>,
    callbacks: RefCell<Vec<DisposeCallback>>,
}

impl Disposal {
    /// Create a signal for a resource
    pub const fn new(id: ResourceId) -> Self {
        Self {
            id,
            disposed: Cell::new(false),
            callbacks: RefCell::new(Vec::new()),
        }
    }

    /// Id of the owning resource
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Whether disposal already happened
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Register a callback. Registering after disposal runs it immediately.
    pub fn on_dispose(&self, callback: impl FnOnce(ResourceId) + 'static) {
        if self.disposed.get() {
            callback(self.id);
        } else {
            self.callbacks.borrow_mut().push(Box::new(callback));
        }
    }

    /// Fire all callbacks. Subsequent calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        for callback in callbacks {
            callback(self.id);
        }
    }
}

impl Drop for Disposal {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposal")
            .field("id", &self.id)
            .field("disposed", &self.disposed.get())
            .field("callbacks", &self.callbacks.borrow().len())
            .finish()
    }
}
