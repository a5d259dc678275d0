use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

/// Observable state cell with interior mutability.
///
/// `State<T>` is the substrate every field, form and validation stores its
/// mutable data in. It uses `Arc<RwLock<T>>` internally, making it cheap to
/// clone and safe to share across async task boundaries. Every write marks the
/// cell dirty and bumps a version counter that observers can wait on through
/// [`State::subscribe`].
///
/// # Example
///
/// ```ignore
/// let count = State::new(0);
/// let mut changes = count.subscribe();
///
/// count.update(|v| *v += 1);
/// changes.changed().await?;
/// assert_eq!(count.get(), 1);
/// ```
#[derive(Debug)]
pub struct State<T> {
    inner: Arc<RwLock<T>>,
    dirty: Arc<AtomicBool>,
    version: Arc<watch::Sender<u64>>,
}

impl<T> State<T> {
    /// Create a new state with the given value
    pub fn new(value: T) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(value)),
            dirty: Arc::new(AtomicBool::new(false)),
            version: Arc::new(version),
        }
    }

    /// Get a clone of the current value
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    /// Set a new value
    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    /// Update the value using a closure, returning whatever the closure returns
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self
                .inner
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut guard)
        };
        self.notify();
        result
    }

    /// Update the value, notifying observers only when the closure reports a change.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let changed = {
            let mut guard = self
                .inner
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut guard)
        };
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.version.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Number of writes observed so far
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to change notifications.
    ///
    /// The receiver treats the current version as already seen, so
    /// `changed()` resolves on the next write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Check if the state has been modified since last check
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            dirty: Arc::clone(&self.dirty),
            version: Arc::clone(&self.version),
        }
    }
}

impl<T: Default> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
