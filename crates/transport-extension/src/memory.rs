//! In-process runtime connection pair.

use crate::{DisconnectListener, RuntimeConnection};
use passcards_transport::delivery::Mailbox;
use passcards_transport::{EventHandler, ListenerId, ListenerSet};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// One end of an in-process runtime connection.
///
/// Messages are delivered to the other end on a spawned task. Disconnecting
/// either end closes both and fires the other end's disconnect listeners.
#[derive(Clone)]
pub struct MemoryRuntimeConnection {
    name: Arc<str>,
    open: Arc<AtomicBool>,
    messages: Arc<ListenerSet<Value>>,
    disconnects: Arc<ListenerSet<()>>,
    peer_messages: Mailbox<Value>,
    peer_disconnects: Mailbox<()>,
}

impl MemoryRuntimeConnection {
    /// Open a named connection, returning both ends.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn pair(name: &str) -> (Self, Self) {
        let name: Arc<str> = Arc::from(name);
        let open = Arc::new(AtomicBool::new(true));

        let left_messages = Arc::new(ListenerSet::new());
        let right_messages = Arc::new(ListenerSet::new());
        let left_disconnects = Arc::new(ListenerSet::new());
        let right_disconnects = Arc::new(ListenerSet::new());

        let left = Self {
            name: Arc::clone(&name),
            open: Arc::clone(&open),
            messages: Arc::clone(&left_messages),
            disconnects: Arc::clone(&left_disconnects),
            peer_messages: Mailbox::spawn(Arc::clone(&right_messages)),
            peer_disconnects: Mailbox::spawn(Arc::clone(&right_disconnects)),
        };
        let right = Self {
            name,
            open,
            messages: right_messages,
            disconnects: right_disconnects,
            peer_messages: Mailbox::spawn(left_messages),
            peer_disconnects: Mailbox::spawn(left_disconnects),
        };

        debug!("Opened in-memory runtime connection '{}'", left.name);

        (left, right)
    }

    /// Whether neither end has disconnected.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of message listeners registered on this end.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.messages.len()
    }
}

impl RuntimeConnection for MemoryRuntimeConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_message_listener(&self, listener: EventHandler) -> ListenerId {
        self.messages.add(move |message| listener(message))
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        self.messages.remove(id)
    }

    fn add_disconnect_listener(&self, listener: DisconnectListener) -> ListenerId {
        self.disconnects.add(move |()| listener())
    }

    fn remove_disconnect_listener(&self, id: ListenerId) -> bool {
        self.disconnects.remove(id)
    }

    fn post_message(&self, message: Value) {
        if !self.is_open() {
            trace!("Connection '{}' is closed, dropping message", self.name);
            return;
        }
        self.peer_messages.post(message);
    }

    fn disconnect(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("Connection '{}' disconnected", self.name);
            self.peer_disconnects.post(());
        }
    }
}
