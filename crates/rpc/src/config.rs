//! Handler configuration.

use std::time::Duration;

/// What to do with a call naming a method that has no handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownMethodPolicy {
    /// Reply with an error so the caller is not left waiting.
    #[default]
    ErrorReply,
    /// Drop the call silently.
    ///
    /// Useful on channels where a handler also receives its own calls, such
    /// as a window posting to itself, and some other handler answers them.
    Ignore,
}

/// Configuration for an [`RpcHandler`](crate::RpcHandler).
#[derive(Clone, Debug, Default)]
pub struct RpcConfig {
    /// How long an outgoing call may wait for its reply. `None` waits forever.
    pub call_timeout: Option<Duration>,
    /// Treatment of calls to unregistered methods.
    pub unknown_method: UnknownMethodPolicy,
}
