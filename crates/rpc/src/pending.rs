//! Outgoing calls awaiting their replies.

use crate::error::Result;
use crate::protocol::CallId;
use crate::registry::panic_message;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::task::AbortHandle;
use tracing::error;

/// Invoked once with the outcome of an outgoing call.
pub(crate) type ReplyCallback = Box<dyn FnOnce(Result<Value>) + Send>;

pub(crate) struct PendingCall {
    method: String,
    callback: ReplyCallback,
    timer: Option<AbortHandle>,
}

impl PendingCall {
    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    /// Deliver the outcome to the caller's callback.
    pub(crate) fn finish(self, outcome: Result<Value>) {
        if let Some(timer) = self.timer {
            timer.abort();
        }

        let callback = self.callback;
        if let Err(payload) =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || callback(outcome)))
        {
            error!(
                method = %self.method,
                "Reply callback panicked: {}",
                panic_message(&*payload)
            );
        }
    }
}

struct Table {
    next_id: CallId,
    calls: HashMap<CallId, PendingCall>,
}

/// Id allocation and the pending-call table.
pub(crate) struct PendingCalls {
    table: Mutex<Table>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                next_id: 1,
                calls: HashMap::new(),
            }),
        }
    }

    /// Record a call and return its id. Ids count up from 1, wrapping and
    /// skipping zero and any id still pending.
    pub(crate) fn register(&self, method: &str, callback: ReplyCallback) -> CallId {
        let mut table = self.table.lock();

        let mut id = table.next_id;
        while id == 0 || table.calls.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        table.next_id = id.wrapping_add(1);

        table.calls.insert(
            id,
            PendingCall {
                method: method.to_owned(),
                callback,
                timer: None,
            },
        );
        id
    }

    /// Attach the timeout task for a call. If the call already finished the
    /// timer is cancelled straight away.
    pub(crate) fn attach_timer(&self, id: CallId, timer: AbortHandle) {
        match self.table.lock().calls.entry(id) {
            Entry::Occupied(mut entry) => entry.get_mut().timer = Some(timer),
            Entry::Vacant(_) => timer.abort(),
        }
    }

    /// Remove a call, if it is still pending.
    pub(crate) fn take(&self, id: CallId) -> Option<PendingCall> {
        self.table.lock().calls.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.table.lock().calls.len()
    }

    /// Drop every pending call without invoking its callback.
    pub(crate) fn clear(&self) {
        let calls: Vec<PendingCall> = self
            .table
            .lock()
            .calls
            .drain()
            .map(|(_, call)| call)
            .collect();
        for call in calls {
            if let Some(timer) = call.timer {
                timer.abort();
            }
        }
    }

    #[cfg(test)]
    fn set_next_id(&self, id: CallId) {
        self.table.lock().next_id = id;
    }
}
