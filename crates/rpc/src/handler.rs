//! The RPC handler: method dispatch and call correlation over one port.

use crate::completion::{Completion, ReplySink, encode};
use crate::config::{RpcConfig, UnknownMethodPolicy};
use crate::error::{Error, Result};
use crate::pending::PendingCalls;
use crate::protocol::{Args, CallId, CallMessage, ReplyMessage};
use crate::registry::{MethodHandler, Registry, guarded};
use passcards_transport::{CALL_EVENT, ListenerId, MessagePort, REPLY_EVENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

/// Builder for [`RpcHandler`].
pub struct RpcHandlerBuilder {
    port: Arc<dyn MessagePort>,
    config: RpcConfig,
}

impl RpcHandlerBuilder {
    /// Start building a handler bound to `port`.
    pub fn new<P: MessagePort>(port: P) -> Self {
        Self {
            port: Arc::new(port),
            config: RpcConfig::default(),
        }
    }

    /// Fail outgoing calls that get no reply within `timeout`.
    #[must_use]
    pub const fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    /// Choose how calls to unregistered methods are treated.
    #[must_use]
    pub const fn unknown_method(mut self, policy: UnknownMethodPolicy) -> Self {
        self.config.unknown_method = policy;
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: RpcConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the handler and start listening on the port.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn build(self) -> RpcHandler {
        RpcHandler::start(self.port, self.config)
    }
}

enum Inbound {
    Call(Value),
    Reply(Value),
}

struct Inner {
    port: Arc<dyn MessagePort>,
    config: RpcConfig,
    registry: Registry,
    pending: Arc<PendingCalls>,
}

/// Both ends of an RPC channel: answers calls for registered methods and
/// makes calls to the other side.
///
/// Incoming envelopes are handled one at a time, in arrival order, on a task
/// owned by the handler. Dropping the handler stops that task, detaches from
/// the port and discards calls still awaiting replies.
pub struct RpcHandler {
    inner: Arc<Inner>,
    listeners: [ListenerId; 2],
    dispatcher: JoinHandle<()>,
}

impl RpcHandler {
    /// Create a handler on `port` with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn new<P: MessagePort>(port: P) -> Self {
        Self::builder(port).build()
    }

    /// Create a builder for a handler on `port`.
    pub fn builder<P: MessagePort>(port: P) -> RpcHandlerBuilder {
        RpcHandlerBuilder::new(port)
    }

    fn start(port: Arc<dyn MessagePort>, config: RpcConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let calls = tx.clone();
        let call_listener = port.on(
            CALL_EVENT,
            Arc::new(move |payload: Value| {
                let _ = calls.send(Inbound::Call(payload));
            }),
        );
        let reply_listener = port.on(
            REPLY_EVENT,
            Arc::new(move |payload: Value| {
                let _ = tx.send(Inbound::Reply(payload));
            }),
        );

        let inner = Arc::new(Inner {
            port,
            config,
            registry: Registry::default(),
            pending: Arc::new(PendingCalls::new()),
        });
        let dispatcher = tokio::spawn(dispatch(Arc::clone(&inner), rx));

        debug!("RPC handler started");

        Self {
            inner,
            listeners: [call_listener, reply_listener],
            dispatcher,
        }
    }

    /// Answer calls to `method` with the return value of `handler`.
    ///
    /// An `Err` is reported to the caller using its `Display` text. Panics
    /// are caught and reported the same way. Registering a method again
    /// replaces the earlier handler.
    pub fn on<F, R, E>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Args) -> std::result::Result<R, E> + Send + Sync + 'static,
        R: Serialize,
        E: Display,
    {
        let method = method.into();
        debug!(method = %method, "Registering method");

        let handler = move |args: Args| match handler(args) {
            Ok(result) => encode(&result),
            Err(error) => Err(error.to_string()),
        };
        self.register(method, MethodHandler::Sync(Arc::new(handler)));
    }

    /// Answer calls to `method` through a [`Completion`] the handler may
    /// finish later, for example from a spawned task.
    ///
    /// If the handler returns `Err` (or panics) before completing, that
    /// failure is the reply and later completions are ignored.
    pub fn on_async<F, E>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Completion, Args) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Display,
    {
        let method = method.into();
        debug!(method = %method, "Registering async method");

        let handler = move |completion: Completion, args: Args| {
            handler(completion, args).map_err(|error| error.to_string())
        };
        self.register(method, MethodHandler::Async(Arc::new(handler)));
    }

    fn register(&self, method: String, handler: MethodHandler) {
        if self.inner.registry.insert(method.clone(), handler) {
            debug!(method = %method, "Replaced existing handler");
        }
    }

    /// Whether a handler is registered for `method`.
    #[must_use]
    pub fn is_registered(&self, method: &str) -> bool {
        self.inner.registry.contains(method)
    }

    /// Number of registered methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Call `method` on the other side, invoking `callback` exactly once with
    /// the outcome, unless the handler is dropped first.
    ///
    /// Returns the id of the call.
    #[instrument(skip(self, args, callback))]
    pub fn call_with<F>(&self, method: &str, args: Vec<Value>, callback: F) -> CallId
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let id = self.inner.pending.register(method, Box::new(callback));

        if let Some(timeout) = self.inner.config.call_timeout {
            self.arm_timeout(id, method, timeout);
        }

        debug!(id, "Sending call");
        self.inner
            .port
            .emit(CALL_EVENT, CallMessage::new(id, method, args).into_value());
        id
    }

    /// Call `method` on the other side and wait for its result.
    ///
    /// `args` must serialize to a list, such as a tuple or a `Vec`; `()`
    /// sends no arguments.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the remote handler failed
    /// - [`Error::Timeout`] if a call timeout is configured and elapsed
    /// - [`Error::InvalidArguments`] if `args` is not a list
    /// - [`Error::Decode`] if the result does not fit `R`
    #[instrument(skip(self, args))]
    pub async fn call<R>(&self, method: &str, args: impl Serialize) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let args = Args::encode(args)?;

        let (tx, rx) = oneshot::channel();
        self.call_with(method, args, move |outcome| {
            let _ = tx.send(outcome);
        });

        let value = rx.await.map_err(|_| Error::ChannelClosed)??;
        serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Number of outgoing calls still awaiting a reply.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.len()
    }

    /// The configuration this handler runs with.
    #[must_use]
    pub fn config(&self) -> &RpcConfig {
        &self.inner.config
    }

    fn arm_timeout(&self, id: CallId, method: &str, timeout: Duration) {
        let pending = Arc::clone(&self.inner.pending);
        let method = method.to_owned();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(call) = pending.take(id) {
                warn!(id, method = %method, "Call timed out after {:?}", timeout);
                call.finish(Err(Error::Timeout { method, timeout }));
            }
        });
        self.inner.pending.attach_timer(id, timer.abort_handle());
    }
}

impl Drop for RpcHandler {
    fn drop(&mut self) {
        self.dispatcher.abort();
        for id in self.listeners {
            self.inner.port.remove_listener(id);
        }
        self.inner.pending.clear();
        debug!("RPC handler stopped");
    }
}

impl Debug for RpcHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcHandler")
            .field("config", &self.inner.config)
            .field("methods", &self.inner.registry.len())
            .field("pending_calls", &self.inner.pending.len())
            .finish_non_exhaustive()
    }
}

async fn dispatch(inner: Arc<Inner>, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
    while let Some(envelope) = inbound.recv().await {
        match envelope {
            Inbound::Call(payload) => inner.handle_call(payload),
            Inbound::Reply(payload) => inner.handle_reply(payload),
        }
    }
}

impl Inner {
    fn handle_call(&self, payload: Value) {
        let CallMessage { id, method, args } = match CallMessage::from_value(payload) {
            Ok(call) => call,
            Err(e) => {
                trace!("Ignoring payload that is not a call: {}", e);
                return;
            }
        };

        let Some(handler) = self.registry.get(&method) else {
            self.unknown_method(id, &method);
            return;
        };

        debug!(id, method = %method, "Handling call");
        let sink = Arc::new(ReplySink::new(id, method, Arc::clone(&self.port)));
        let args = Args::new(args);

        match handler {
            MethodHandler::Sync(handler) => {
                sink.send(guarded(|| handler(args)));
            }
            MethodHandler::Async(handler) => {
                let completion = Completion::new(Arc::clone(&sink));
                match guarded(|| handler(completion, args)) {
                    Ok(()) => sink.arm(),
                    Err(message) => {
                        sink.send(Err(message));
                    }
                }
            }
        }
    }

    fn unknown_method(&self, id: CallId, method: &str) {
        match self.config.unknown_method {
            UnknownMethodPolicy::ErrorReply => {
                warn!(id, method, "No handler registered for method");
                self.port.emit(
                    REPLY_EVENT,
                    ReplyMessage::failure(id, format!("No handler registered for method: {method}"))
                        .into_value(),
                );
            }
            UnknownMethodPolicy::Ignore => {
                debug!(id, method, "Ignoring call to unregistered method");
            }
        }
    }

    fn handle_reply(&self, payload: Value) {
        let reply = match ReplyMessage::from_value(payload) {
            Ok(reply) => reply,
            Err(e) => {
                trace!("Ignoring payload that is not a reply: {}", e);
                return;
            }
        };

        let Some(call) = self.pending.take(reply.id) else {
            debug!(id = reply.id, "Discarding reply with no pending call");
            return;
        };

        debug!(id = reply.id, method = call.method(), "Received reply");
        call.finish(reply.into_outcome());
    }
}
