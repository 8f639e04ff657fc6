//! In-process named-event port pair.

use crate::NativePort;
use passcards_transport::delivery::Mailbox;
use passcards_transport::{EventHandler, ListenerId, ListenerSet};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

type NamedEvent = (String, Value);

/// One end of an in-process port pair.
///
/// Events emitted on one end are delivered on a spawned task to the listeners
/// of the other end, so `emit` never runs a listener synchronously.
#[derive(Clone)]
pub struct MemoryPort {
    listeners: Arc<ListenerSet<NamedEvent>>,
    peer: Mailbox<NamedEvent>,
}

impl MemoryPort {
    /// Create two connected port ends.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let left_listeners = Arc::new(ListenerSet::new());
        let right_listeners = Arc::new(ListenerSet::new());

        let to_left = Mailbox::spawn(Arc::clone(&left_listeners));
        let to_right = Mailbox::spawn(Arc::clone(&right_listeners));

        debug!("Created in-memory port pair");

        (
            Self {
                listeners: left_listeners,
                peer: to_right,
            },
            Self {
                listeners: right_listeners,
                peer: to_left,
            },
        )
    }

    /// Number of listeners registered on this end.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl NativePort for MemoryPort {
    fn on(&self, event: &str, handler: EventHandler) -> ListenerId {
        let event = event.to_owned();
        self.listeners.add(move |(name, payload): NamedEvent| {
            if name == event {
                handler(payload);
            }
        })
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn emit(&self, event: &str, payload: Value) {
        if !self.peer.post((event.to_owned(), payload)) {
            trace!("Dropping '{}' event, peer port is gone", event);
        }
    }
}
