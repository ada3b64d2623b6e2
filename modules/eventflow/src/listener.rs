//! Listener handles.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::types::EventRecord;

type ListenerFn = dyn Fn(&mut EventRecord) -> Result<()> + Send + Sync;

/// A registered callback.
///
/// Cheap to clone. Equality is handle identity: clones compare equal, two
/// listeners built separately never do, even from the same function.
/// Keep the handle around to unregister it later.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerFn>,
}

impl Listener {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut EventRecord) -> Result<()> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Invoke with one serialized event.
    pub fn call(&self, record: &mut EventRecord) -> Result<()> {
        (self.inner)(record)
    }

    pub fn same_as(&self, other: &Listener) -> bool {
        // Compare data pointers only; vtable pointers may differ across codegen units.
        std::ptr::eq(
            Arc::as_ptr(&self.inner) as *const (),
            Arc::as_ptr(&other.inner) as *const (),
        )
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.inner) as *const ())
    }
}
