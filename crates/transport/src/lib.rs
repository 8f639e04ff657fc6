//! Generic duplex channel abstraction for cross-context messaging
//!
//! This crate provides the transport-agnostic interface that every native messaging
//! primitive is adapted to before an RPC layer is put on top of it.
//! Specific adapters (worker ports, cross-window messaging, extension runtime ports)
//! are provided in separate crates.
//!
//! Transports handle:
//! - Registering listeners for named events on this end of the channel
//! - Emitting named events to the other end of the channel
//! - Fanning out one inbound message to every matching listener
//!
//! Transports never look inside the payloads they carry.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod delivery;
pub mod listeners;

use serde_json::Value;
use std::sync::Arc;

pub use listeners::{ListenerId, ListenerSet};

/// Event name used for call envelopes.
pub const CALL_EVENT: &str = "rpc-call";

/// Event name used for reply envelopes.
pub const REPLY_EVENT: &str = "rpc-reply";

/// Callback invoked with the payload of an inbound event.
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// One end of a duplex message channel.
///
/// Implementations:
/// - Deliver every emitted payload to the listeners registered for the same
///   event name on the *other* end of the channel
/// - Deliver asynchronously: `emit` returns before any remote listener runs
/// - Never report delivery failures to the emitter
pub trait MessagePort: Send + Sync + 'static {
    /// Register `handler` for messages tagged with `event`.
    ///
    /// Every handler registered for the same event fires, in registration order.
    fn on(&self, event: &str, handler: EventHandler) -> ListenerId;

    /// Remove a listener previously returned by [`MessagePort::on`].
    ///
    /// Returns `false` if the listener was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Send `payload` tagged with `event` to the other end of the channel.
    fn emit(&self, event: &str, payload: Value);
}

impl<P> MessagePort for Arc<P>
where
    P: MessagePort + ?Sized,
{
    fn on(&self, event: &str, handler: EventHandler) -> ListenerId {
        (**self).on(event, handler)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        (**self).remove_listener(id)
    }

    fn emit(&self, event: &str, payload: Value) {
        (**self).emit(event, payload);
    }
}
