//! Deferred replies for asynchronous handlers.

use crate::protocol::{CallId, ReplyMessage};
use crate::registry::Outcome;
use passcards_transport::{MessagePort, REPLY_EVENT};
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Reply text for a call whose [`Completion`] was dropped unused.
pub(crate) const DROPPED_COMPLETION: &str = "completion dropped without a reply";

/// Sends the reply for one incoming call, at most once.
pub(crate) struct ReplySink {
    id: CallId,
    method: String,
    port: Arc<dyn MessagePort>,
    sent: AtomicBool,
    // Set once the handler has returned `Ok`.
    armed: AtomicBool,
    // Set when the completion was dropped without replying.
    abandoned: AtomicBool,
}

impl ReplySink {
    pub(crate) fn new(id: CallId, method: String, port: Arc<dyn MessagePort>) -> Self {
        Self {
            id,
            method,
            port,
            sent: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            abandoned: AtomicBool::new(false),
        }
    }

    /// Emit the reply. Returns false if one was already sent.
    pub(crate) fn send(&self, outcome: Outcome) -> bool {
        if self.sent.swap(true, Ordering::AcqRel) {
            debug!(
                id = self.id,
                method = %self.method,
                "Reply already sent, discarding later outcome"
            );
            return false;
        }

        debug!(
            id = self.id,
            method = %self.method,
            ok = outcome.is_ok(),
            "Sending reply"
        );
        self.port.emit(
            REPLY_EVENT,
            ReplyMessage::from_outcome(self.id, outcome).into_value(),
        );
        true
    }

    /// Mark the handler as having accepted the call. From here on a dropped
    /// completion fails the call, including one dropped while the handler ran.
    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
        if self.abandoned.load(Ordering::SeqCst) {
            self.fail_abandoned();
        }
    }

    fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
        if self.armed.load(Ordering::SeqCst) {
            self.fail_abandoned();
        }
    }

    fn fail_abandoned(&self) {
        if !self.sent.load(Ordering::Acquire) {
            warn!(id = self.id, method = %self.method, "Completion dropped without a reply");
            self.send(Err(DROPPED_COMPLETION.to_owned()));
        }
    }
}

/// Completes a call accepted by an asynchronous handler.
///
/// The handler may move this into a spawned task and finish the call whenever
/// its work is done. Only the first outcome reported for a call is sent; if
/// the handler fails before completing, that failure is the reply instead.
/// Dropping a `Completion` without using it, for example when the task
/// holding it panics, fails the call.
pub struct Completion {
    sink: Arc<ReplySink>,
}

impl Completion {
    pub(crate) const fn new(sink: Arc<ReplySink>) -> Self {
        Self { sink }
    }

    /// Id of the call being completed.
    #[must_use]
    pub fn call_id(&self) -> CallId {
        self.sink.id
    }

    /// Name of the method being completed.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.sink.method
    }

    /// Reply with a result.
    pub fn resolve<R: Serialize>(self, result: R) {
        self.sink.send(encode(&result));
    }

    /// Reply with a failure.
    pub fn reject(self, error: impl Display) {
        self.sink.send(Err(error.to_string()));
    }

    /// Reply with either outcome.
    pub fn complete<R: Serialize, E: Display>(self, outcome: Result<R, E>) {
        match outcome {
            Ok(result) => self.resolve(result),
            Err(error) => self.reject(error),
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.sink.sent.load(Ordering::Acquire) {
            self.sink.abandon();
        }
    }
}

pub(crate) fn encode<R: Serialize>(result: &R) -> Outcome {
    serde_json::to_value(result).map_err(|e| format!("Failed to encode result: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use passcards_transport::{EventHandler, ListenerId};
    use serde_json::{Value, json};

    /// Port that records everything emitted on it.
    #[derive(Default)]
    struct RecordingPort {
        emitted: Mutex<Vec<(String, Value)>>,
    }

    impl MessagePort for RecordingPort {
        fn on(&self, _event: &str, _handler: EventHandler) -> ListenerId {
            unreachable!("replies never listen")
        }

        fn remove_listener(&self, _id: ListenerId) -> bool {
            false
        }

        fn emit(&self, event: &str, payload: Value) {
            self.emitted.lock().push((event.to_owned(), payload));
        }
    }

    fn sink(port: &Arc<RecordingPort>, id: CallId) -> Arc<ReplySink> {
        let port: Arc<dyn MessagePort> = Arc::clone(port) as Arc<dyn MessagePort>;
        Arc::new(ReplySink::new(id, "divide".to_owned(), port))
    }

    #[test]
    fn test_only_first_outcome_is_sent() {
        let port = Arc::new(RecordingPort::default());
        let sink = sink(&port, 9);
        sink.arm();

        Completion::new(Arc::clone(&sink)).resolve(2.5);
        Completion::new(Arc::clone(&sink)).reject("too late");
        drop(Completion::new(Arc::clone(&sink)));
        assert!(!sink.send(Ok(json!(0))));

        let emitted = port.emitted.lock();
        assert_eq!(
            *emitted,
            vec![(REPLY_EVENT.to_owned(), json!({"id": 9, "result": 2.5}))]
        );
    }

    #[test]
    fn test_complete_with_error() {
        let port = Arc::new(RecordingPort::default());
        let completion = Completion::new(sink(&port, 4));
        assert_eq!(completion.call_id(), 4);
        assert_eq!(completion.method(), "divide");

        completion.complete::<f64, _>(Err("divide-by-zero"));

        let emitted = port.emitted.lock();
        assert_eq!(
            emitted[0].1,
            json!({"id": 4, "error": {"message": "divide-by-zero"}})
        );
    }

    #[test]
    fn test_drop_after_accept_fails_the_call() {
        let port = Arc::new(RecordingPort::default());
        let sink = sink(&port, 5);
        let completion = Completion::new(Arc::clone(&sink));

        sink.arm();
        drop(completion);

        assert_eq!(
            port.emitted.lock()[0].1,
            json!({"id": 5, "error": {"message": DROPPED_COMPLETION}})
        );
    }

    #[test]
    fn test_drop_while_handler_runs_waits_for_its_outcome() {
        let port = Arc::new(RecordingPort::default());
        let sink = sink(&port, 6);

        // The handler drops its completion, then fails on its own.
        drop(Completion::new(Arc::clone(&sink)));
        assert!(port.emitted.lock().is_empty());
        sink.send(Err("divide-by-zero".to_owned()));

        assert_eq!(
            *port.emitted.lock(),
            vec![(
                REPLY_EVENT.to_owned(),
                json!({"id": 6, "error": {"message": "divide-by-zero"}})
            )]
        );
    }

    #[test]
    fn test_drop_while_handler_runs_fails_once_accepted() {
        let port = Arc::new(RecordingPort::default());
        let sink = sink(&port, 7);

        drop(Completion::new(Arc::clone(&sink)));
        sink.arm();

        assert_eq!(port.emitted.lock().len(), 1);
        assert_eq!(
            port.emitted.lock()[0].1,
            json!({"id": 7, "error": {"message": DROPPED_COMPLETION}})
        );
    }
}
