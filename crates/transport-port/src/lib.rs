//! Worker / content-script port transport
//!
//! Content scripts and workers talk to their host through a port object that
//! already speaks in named events (`port.on(name, fn)` / `port.emit(name, data)`).
//! [`WorkerPort`] adapts such a port to [`MessagePort`] by passing calls straight
//! through, and [`MemoryPort`] provides an in-process port pair with the same
//! semantics for embedding and tests.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod memory;

use parking_lot::Mutex;
use passcards_transport::{EventHandler, ListenerId, MessagePort};
use serde_json::Value;
use tracing::debug;

pub use memory::MemoryPort;

/// A native port that already exposes named-event messaging.
pub trait NativePort: Send + Sync + 'static {
    /// Register `handler` for events named `event` arriving on this port.
    fn on(&self, event: &str, handler: EventHandler) -> ListenerId;

    /// Remove a handler registered with [`NativePort::on`].
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Send a named event to the other side of the port.
    fn emit(&self, event: &str, payload: Value);
}

/// [`MessagePort`] over a worker or content-script port.
///
/// Listeners registered through the adapter are removed from the native port
/// when the adapter is dropped; the native port itself may outlive it.
pub struct WorkerPort<P: NativePort> {
    port: P,
    registered: Mutex<Vec<ListenerId>>,
}

impl<P: NativePort> WorkerPort<P> {
    /// Wrap a native port.
    pub fn new(port: P) -> Self {
        Self {
            port,
            registered: Mutex::new(Vec::new()),
        }
    }
}

impl<P: NativePort> MessagePort for WorkerPort<P> {
    fn on(&self, event: &str, handler: EventHandler) -> ListenerId {
        let id = self.port.on(event, handler);
        self.registered.lock().push(id);
        debug!("Worker port registered {} for '{}'", id, event);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.registered.lock().retain(|existing| *existing != id);
        self.port.remove_listener(id)
    }

    fn emit(&self, event: &str, payload: Value) {
        self.port.emit(event, payload);
    }
}

impl<P: NativePort> Drop for WorkerPort<P> {
    fn drop(&mut self) {
        for id in self.registered.get_mut().drain(..) {
            self.port.remove_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_pass_through_named_events() {
        let _ = tracing_subscriber::fmt::try_init();

        let (left, right) = MemoryPort::pair();
        let left = WorkerPort::new(left);
        let right = WorkerPort::new(right);

        let (tx, mut rx) = mpsc::unbounded_channel();
        right.on(
            "greeting",
            Arc::new(move |payload: Value| {
                let _ = tx.send(payload);
            }),
        );

        left.emit("greeting", json!({"text": "hello"}));

        let received = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(received, Some(json!({"text": "hello"})));
    }

    #[tokio::test]
    async fn test_drop_removes_native_listeners() {
        let (left, right) = MemoryPort::pair();
        let native = right.clone();

        {
            let adapter = WorkerPort::new(right);
            adapter.on("a", Arc::new(|_: Value| {}));
            adapter.on("b", Arc::new(|_: Value| {}));
            assert_eq!(native.listener_count(), 2);
        }

        assert_eq!(native.listener_count(), 0);
        drop(left);
    }
}
