//! Method handler registry.

use crate::completion::Completion;
use crate::protocol::Args;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Result of running a handler: the reply value or a failure message.
pub(crate) type Outcome = Result<Value, String>;

/// Handler that produces its reply directly.
pub(crate) type SyncHandler = Arc<dyn Fn(Args) -> Outcome + Send + Sync>;

/// Handler that replies later through a [`Completion`]. An `Err` means it
/// failed before it could arrange a reply.
pub(crate) type AsyncHandler = Arc<dyn Fn(Completion, Args) -> Result<(), String> + Send + Sync>;

/// A registered method.
#[derive(Clone)]
pub(crate) enum MethodHandler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

/// Methods this side answers, keyed by name. Registering a name again
/// replaces the previous handler.
#[derive(Default)]
pub(crate) struct Registry {
    methods: RwLock<HashMap<String, MethodHandler>>,
}

impl Registry {
    /// Returns true if an earlier handler was replaced.
    pub(crate) fn insert(&self, method: String, handler: MethodHandler) -> bool {
        self.methods.write().insert(method, handler).is_some()
    }

    pub(crate) fn get(&self, method: &str) -> Option<MethodHandler> {
        self.methods.read().get(method).cloned()
    }

    pub(crate) fn contains(&self, method: &str) -> bool {
        self.methods.read().contains_key(method)
    }

    pub(crate) fn len(&self) -> usize {
        self.methods.read().len()
    }
}

/// Run user code, turning a panic into a failure message.
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(panic_message(&*payload)))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_owned())
}
