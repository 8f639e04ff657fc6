//! In-process window pair for embedding and tests.

use crate::{MessageEvent, MessageWindow, TargetOrigin, WindowListener};
use passcards_transport::delivery::Mailbox;
use passcards_transport::{ListenerId, ListenerSet};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One of two connected in-process windows.
///
/// `post_message` on one window dispatches a [`MessageEvent`] to the other
/// window's listeners on a spawned task. As in a browser, a message whose
/// target origin does not match the receiving window's origin is discarded.
#[derive(Clone)]
pub struct MemoryWindow {
    origin: String,
    peer_origin: String,
    listeners: Arc<ListenerSet<MessageEvent>>,
    peer: Mailbox<MessageEvent>,
}

impl MemoryWindow {
    /// Create two connected windows with the given origins.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn pair(left_origin: &str, right_origin: &str) -> (Self, Self) {
        let left_listeners = Arc::new(ListenerSet::new());
        let right_listeners = Arc::new(ListenerSet::new());

        let to_left = Mailbox::spawn(Arc::clone(&left_listeners));
        let to_right = Mailbox::spawn(Arc::clone(&right_listeners));

        debug!(
            "Created in-memory window pair {} <-> {}",
            left_origin, right_origin
        );

        (
            Self {
                origin: left_origin.to_owned(),
                peer_origin: right_origin.to_owned(),
                listeners: left_listeners,
                peer: to_right,
            },
            Self {
                origin: right_origin.to_owned(),
                peer_origin: left_origin.to_owned(),
                listeners: right_listeners,
                peer: to_left,
            },
        )
    }

    /// Number of `message` listeners registered on this window.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl MessageWindow for MemoryWindow {
    fn add_message_listener(&self, listener: WindowListener) -> ListenerId {
        self.listeners.add(move |event| listener(event))
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn post_message(&self, message: Value, target_origin: &str) {
        if !TargetOrigin::parse(target_origin).matches(&self.peer_origin) {
            debug!(
                "Discarding message for {}, receiving window is {}",
                target_origin, self.peer_origin
            );
            return;
        }

        self.peer.post(MessageEvent {
            data: message,
            origin: self.origin.clone(),
        });
    }
}
