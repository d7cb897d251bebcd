//! Unix domain socket transport for the busybus daemon and client.
//!
//! Everything here is synchronous and non-blocking: sockets never block the
//! calling thread, and the router is expected to gate reads and writes on
//! [`unix::poll_ready`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod unix;

pub use error::{Result, TransportError};
pub use unix::{
    accept, connect, listen, peer_credentials, poll_ready, recv_exact, send_all, PeerCredentials,
    DEFAULT_POLL_TIMEOUT_MS, DEFAULT_SOCKPATH, MAX_SOCKPATH_LEN,
};
