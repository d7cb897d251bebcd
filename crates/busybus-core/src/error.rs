//! Shared error taxonomy for the session layer and method registry.

use thiserror::Error;

use crate::session::SessionState;

/// Errors raised by the per-session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A message arrived that the current state doesn't accept.
    #[error("unexpected message in state {state:?}: msgtype {msgtype}")]
    UnexpectedMessage {
        /// State the session was in.
        state: SessionState,
        /// Raw msgtype byte of the offending message.
        msgtype: u8,
    },

    /// SO frame named an unrecognized or missing session-open type.
    #[error("invalid session-open type")]
    InvalidSoType,

    /// The authentication hook rejected the peer's credentials.
    #[error("client unauthorized")]
    Unauthorized,

    /// Underlying wire-level error (bad magic, truncated payload, ...).
    #[error("protocol error: {0}")]
    Protocol(#[from] busybus_proto::ProtocolError),
}

/// Errors raised by the method registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A method is already registered at this path.
    #[error("method already registered at {path}")]
    AlreadyRegistered {
        /// Fully dotted path.
        path: String,
    },

    /// No method is registered at this path.
    #[error("no such method: {path}")]
    NoMethod {
        /// Fully dotted path that was looked up.
        path: String,
    },

    /// A path component exists as a method, so it can't also be a service
    /// node, or vice versa.
    #[error("path component conflict at {path}")]
    PathConflict {
        /// Fully dotted path where the conflict occurred.
        path: String,
    },

    /// A provider tried to register a method at the top level (no dot), so
    /// there's no leaf name to forward in SRVCALL's meta.
    #[error("registration rejected: path has no leaf component: {path}")]
    NoLeafComponent {
        /// The rejected service path.
        path: String,
    },

    /// A SRVREG meta string didn't have the four comma-separated fields
    /// `<service-path>,<method-name>,<arg-descr>,<ret-descr>`.
    #[error("malformed registration descriptor: {0}")]
    InvalidDescriptor(String),
}
