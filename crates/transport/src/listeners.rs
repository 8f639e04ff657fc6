//! Fan-out listener registry shared by port implementations.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a registered listener.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// An ordered set of listeners that all receive every dispatched message.
///
/// Listeners are invoked outside the internal lock, so a listener may register
/// or remove listeners (including itself) while being dispatched to.
pub struct ListenerSet<T> {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
}

impl<T: Clone> ListenerSet<T> {
    /// Create an empty listener set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Add a listener, returning the id used to remove it.
    pub fn add(&self, listener: impl Fn(T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not present.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Invoke every listener with a clone of `message`, in registration order.
    pub fn dispatch(&self, message: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(message.clone());
        }
    }
}

impl<T: Clone> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
