//! Extension runtime port transport
//!
//! Browser extensions connect their background page and content scripts with
//! long-lived runtime ports (`runtime.connect()`), which expose a single
//! `onMessage` event, a `postMessage` primitive and an `onDisconnect` event.
//! [`RuntimeMessagePort`] maps `onMessage` to [`MessagePort::on`] and
//! `postMessage` to [`MessagePort::emit`] without any extra framing.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod memory;

use parking_lot::Mutex;
use passcards_transport::{EventHandler, ListenerId, MessagePort};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub use memory::MemoryRuntimeConnection;

/// Listener for runtime port disconnection.
pub type DisconnectListener = Arc<dyn Fn() + Send + Sync>;

/// A long-lived connection provided by an extension runtime.
pub trait RuntimeConnection: Send + Sync + 'static {
    /// Name the connection was opened with.
    fn name(&self) -> &str;

    /// Equivalent of `port.onMessage.addListener(listener)`.
    fn add_message_listener(&self, listener: EventHandler) -> ListenerId;

    /// Equivalent of `port.onMessage.removeListener(listener)`.
    fn remove_message_listener(&self, id: ListenerId) -> bool;

    /// Equivalent of `port.onDisconnect.addListener(listener)`.
    fn add_disconnect_listener(&self, listener: DisconnectListener) -> ListenerId;

    /// Equivalent of `port.onDisconnect.removeListener(listener)`.
    fn remove_disconnect_listener(&self, id: ListenerId) -> bool;

    /// Equivalent of `port.postMessage(message)`.
    fn post_message(&self, message: Value);

    /// Equivalent of `port.disconnect()`.
    fn disconnect(&self);
}

/// [`MessagePort`] over an extension runtime connection.
pub struct RuntimeMessagePort<C: RuntimeConnection> {
    connection: C,
    connected: Arc<AtomicBool>,
    disconnect_listener: ListenerId,
    registered: Mutex<Vec<ListenerId>>,
}

impl<C: RuntimeConnection> RuntimeMessagePort<C> {
    /// Wrap a runtime connection.
    pub fn new(connection: C) -> Self {
        let connected = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&connected);
        let name = connection.name().to_owned();
        let disconnect_listener = connection.add_disconnect_listener(Arc::new(move || {
            if flag.swap(false, Ordering::AcqRel) {
                info!("Runtime port '{}' disconnected by peer", name);
            }
        }));

        Self {
            connection,
            connected,
            disconnect_listener,
            registered: Mutex::new(Vec::new()),
        }
    }

    /// Whether the connection is still open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Close the connection. Later emits are dropped.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            debug!("Disconnecting runtime port '{}'", self.connection.name());
            self.connection.disconnect();
        }
    }
}

impl<C: RuntimeConnection> MessagePort for RuntimeMessagePort<C> {
    fn on(&self, event: &str, handler: EventHandler) -> ListenerId {
        let id = self.connection.add_message_listener(handler);
        self.registered.lock().push(id);
        debug!(
            "Runtime port '{}' registered {} for '{}'",
            self.connection.name(),
            id,
            event
        );
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.registered.lock().retain(|existing| *existing != id);
        self.connection.remove_message_listener(id)
    }

    fn emit(&self, event: &str, payload: Value) {
        if !self.is_connected() {
            warn!(
                "Dropping '{}' on disconnected runtime port '{}'",
                event,
                self.connection.name()
            );
            return;
        }
        self.connection.post_message(payload);
    }
}

impl<C: RuntimeConnection> Drop for RuntimeMessagePort<C> {
    fn drop(&mut self) {
        for id in self.registered.get_mut().drain(..) {
            self.connection.remove_message_listener(id);
        }
        self.connection
            .remove_disconnect_listener(self.disconnect_listener);
    }
}
