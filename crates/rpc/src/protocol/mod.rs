//! Wire envelopes and argument handling.
//!
//! Calls and replies travel as JSON objects over a [`MessagePort`]:
//! - calls on the `rpc-call` event: `{"id", "method", "args"}`
//! - replies on the `rpc-reply` event: `{"id", "error"?, "result"?}`
//!
//! [`MessagePort`]: passcards_transport::MessagePort

pub mod args;
pub mod message;

pub use args::Args;
pub use message::{CallId, CallMessage, ErrorInfo, ReplyMessage};
