use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Action = Box<dyn FnOnce() + Send>;

struct Inner {
    id: String,
    done: AtomicBool,
    action: Mutex<Option<Action>>,
}

/// Removes one registration made through an
/// [`EventManager`](super::EventManager).
///
/// Clones share state: the removal runs exactly once no matter how many
/// clones call [`Unsubscribe::call`]. A no-op handle is returned whenever a
/// registration was refused.
#[derive(Clone)]
pub struct Unsubscribe {
    inner: Option<Arc<Inner>>,
}

impl Unsubscribe {
    pub(crate) fn new(id: impl Into<String>, action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                id: id.into(),
                done: AtomicBool::new(false),
                action: Mutex::new(Some(Box::new(action))),
            })),
        }
    }

    /// A handle that does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Run the removal. Returns `true` only for the call that actually removed it.
    pub fn call(&self) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };
        if inner.done.swap(true, Ordering::SeqCst) {
            return false;
        }
        let action = inner.action.lock().unwrap().take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    /// Mark the registration gone without running the removal. Used when the
    /// registration ended on its own (a fired timeout or `once` listener).
    pub(crate) fn retire(&self) {
        if let Some(inner) = &self.inner
            && !inner.done.swap(true, Ordering::SeqCst)
        {
            inner.action.lock().unwrap().take();
        }
    }

    /// Registration id, `None` for no-op handles.
    pub fn id(&self) -> Option<&str> {
        self.inner.as_ref().map(|i| i.id.as_str())
    }

    /// Whether this handle was returned for a refused registration.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether the removal has not run yet.
    pub fn is_active(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|i| !i.done.load(Ordering::SeqCst))
    }

    /// Whether both handles refer to the same registration.
    pub fn same_as(&self, other: &Unsubscribe) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}
