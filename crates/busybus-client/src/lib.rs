//! Blocking client library for busybus: connect as a caller, provider,
//! monitor, or control client and exchange framed messages with `bbusd`.
//!
//! # Architecture
//!
//! Every session type is a thin, blocking wrapper around [`Connection`],
//! which owns the handshake and the framed send/recv pair. Calls block the
//! calling thread until the matching reply arrives. Each fallible call also
//! mirrors its outcome into a thread-local error code via
//! [`error::last_error`], so multiple threads in one process can each own a
//! distinct connection without racing on shared state.
//!
//! # Session types
//!
//! - [`CallerClient`]: calls named methods and waits for the reply.
//! - [`ProviderClient`]: registers methods and serves incoming calls.
//! - [`MonitorClient`]: receives a copy of every message the daemon routes.
//! - [`ControlClient`]: enumerates methods/clients and requests shutdown.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod caller;
mod connection;
mod control;
mod error;
mod monitor;
mod provider;
mod sockpath;

pub use caller::CallerClient;
pub use connection::Connection;
pub use control::ControlClient;
pub use error::{last_error, ClientError, ErrorCode, Result};
pub use monitor::MonitorClient;
pub use provider::{MethodHandler, ProviderClient};
pub use sockpath::{resolve as resolve_sockpath, set_sockpath};

pub use busybus_proto::{Object, Value};
