//! Cross-window messaging transport
//!
//! This implementation carries messages between two window-like objects that can
//! only exchange untyped messages through a `postMessage`-style primitive:
//! - Sending: every payload is posted verbatim with the configured target origin
//! - Receiving: every `message` event is forwarded to every registered listener,
//!   filtered by origin when the target origin is not the wildcard
//!
//! The native primitive only has one generic message event, so this port does not
//! separate event names; listeners demultiplex by payload shape.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod memory;
mod origin;

use parking_lot::Mutex;
use passcards_transport::{EventHandler, ListenerId, MessagePort};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

pub use memory::MemoryWindow;
pub use origin::TargetOrigin;

/// A `message` event as seen by a window listener.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEvent {
    /// The posted message.
    pub data: Value,

    /// Origin of the window that posted the message.
    pub origin: String,
}

/// Listener for window `message` events.
pub type WindowListener = Arc<dyn Fn(MessageEvent) + Send + Sync>;

/// A window-like object that can post and receive untyped messages.
pub trait MessageWindow: Send + Sync + 'static {
    /// Equivalent of `addEventListener('message', listener)`.
    fn add_message_listener(&self, listener: WindowListener) -> ListenerId;

    /// Equivalent of `removeEventListener('message', listener)`.
    fn remove_message_listener(&self, id: ListenerId) -> bool;

    /// Equivalent of `otherWindow.postMessage(message, targetOrigin)`.
    fn post_message(&self, message: Value, target_origin: &str);
}

/// [`MessagePort`] over a pair of windows communicating with `postMessage`.
pub struct WindowMessagePort<W: MessageWindow> {
    window: W,
    target_origin: TargetOrigin,
    registered: Mutex<Vec<ListenerId>>,
}

impl<W: MessageWindow> WindowMessagePort<W> {
    /// Wrap `window`, posting to and accepting messages from `target_origin`.
    ///
    /// Pass `"*"` to post to any origin and accept messages from any origin.
    pub fn new(window: W, target_origin: impl Into<TargetOrigin>) -> Self {
        Self {
            window,
            target_origin: target_origin.into(),
            registered: Mutex::new(Vec::new()),
        }
    }

    /// The configured target origin.
    pub const fn target_origin(&self) -> &TargetOrigin {
        &self.target_origin
    }
}

impl<W: MessageWindow> MessagePort for WindowMessagePort<W> {
    fn on(&self, event: &str, handler: EventHandler) -> ListenerId {
        let accepted = self.target_origin.clone();
        let id = self
            .window
            .add_message_listener(Arc::new(move |message: MessageEvent| {
                if !accepted.matches(&message.origin) {
                    trace!(
                        "Ignoring message from {} (expected {})",
                        message.origin, accepted
                    );
                    return;
                }
                handler(message.data);
            }));

        self.registered.lock().push(id);
        debug!("Window port registered {} for '{}'", id, event);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.registered.lock().retain(|existing| *existing != id);
        self.window.remove_message_listener(id)
    }

    fn emit(&self, _event: &str, payload: Value) {
        self.window
            .post_message(payload, self.target_origin.as_str());
    }
}

impl<W: MessageWindow> Drop for WindowMessagePort<W> {
    fn drop(&mut self) {
        for id in self.registered.get_mut().drain(..) {
            self.window.remove_message_listener(id);
        }
    }
}
