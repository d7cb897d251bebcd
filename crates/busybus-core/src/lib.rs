//! Session state machine, method registry and pending-call table shared by
//! the busybus daemon and client library.
//!
//! Nothing in this crate touches a socket: every state machine here follows
//! the action pattern, taking an event and returning the actions the router
//! must carry out. This keeps the routing logic testable without a real
//! transport.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod pending;
pub mod registry;
pub mod session;

pub use error::{RegistryError, SessionError};
pub use pending::PendingTable;
pub use registry::{echo, parse_srvreg_descriptor, LocalFn, MethodEntry, RegDescriptor, Registry, SessionId};
pub use session::{ClientType, Session, SessionAction, SessionState};
