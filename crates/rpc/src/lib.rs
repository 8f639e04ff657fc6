//! Request/response RPC over an event-style message port.
//!
//! An [`RpcHandler`] sits on one end of a [`MessagePort`] and plays both
//! roles: it answers calls for the methods registered on it and calls
//! methods registered on the other end. Calls are correlated with their
//! replies by a numeric id, so any number may be outstanding at once and
//! replies may arrive in any order.
//!
//! The same handler works over every port implementation, such as a worker
//! port, a cross-window port or an extension runtime connection.
//!
//! # Example
//!
//! ```no_run
//! use passcards_rpc::{Args, HandlerError, RpcHandler};
//! use passcards_transport_port::{MemoryPort, WorkerPort};
//!
//! # async fn example() -> Result<(), passcards_rpc::Error> {
//! let (page, worker) = MemoryPort::pair();
//! let page = RpcHandler::new(WorkerPort::new(page));
//! let worker = RpcHandler::new(WorkerPort::new(worker));
//!
//! worker.on("add", |args: Args| -> Result<i64, HandlerError> {
//!     let (a, b): (i64, i64) = args.parse()?;
//!     Ok(a + b)
//! });
//!
//! let sum: i64 = page.call("add", (3, 4)).await?;
//! assert_eq!(sum, 7);
//! # Ok(())
//! # }
//! ```
//!
//! [`MessagePort`]: passcards_transport::MessagePort

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod completion;
pub mod config;
pub mod error;
mod handler;
mod pending;
pub mod protocol;
mod registry;

pub use completion::Completion;
pub use config::{RpcConfig, UnknownMethodPolicy};
pub use error::{Error, HandlerError, Result};
pub use handler::{RpcHandler, RpcHandlerBuilder};
pub use protocol::{Args, CallId, CallMessage, ErrorInfo, ReplyMessage};
