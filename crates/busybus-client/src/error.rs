//! Client-facing error type and the thread-local last-error-code state
//! mirrored from it (the source library's global error-code convention,
//! made thread-local so that multiple threads in one process can each own
//! distinct connections without racing on a shared variable).

use std::cell::Cell;

use thiserror::Error;

/// Numeric error-code taxonomy mirrored onto thread-local state after every
/// fallible call, independent of the `Result` the call also returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error.
    Good,
    /// A supplied argument, description, or buffer was invalid.
    InvalidArgument,
    /// The session-open handshake was rejected by the daemon.
    SessionRejected,
    /// A called method does not exist.
    NoMethod,
    /// The called method reported an error.
    MethodError,
    /// Registering a method with the daemon failed.
    RegistrationError,
    /// A connection-level I/O failure.
    Io,
    /// The daemon sent a reply that didn't match anything this client is
    /// waiting for.
    Protocol,
}

thread_local! {
    static LAST_ERROR: Cell<ErrorCode> = const { Cell::new(ErrorCode::Good) };
}

/// The calling thread's most recently set error code. Reset to `Good` by
/// any call that succeeds.
#[must_use]
pub fn last_error() -> ErrorCode {
    LAST_ERROR.with(Cell::get)
}

pub(crate) fn set_last_error(code: ErrorCode) {
    LAST_ERROR.with(|cell| cell.set(code));
}

/// Errors a busybus client call can fail with.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The socket path exceeded [`busybus_transport::MAX_SOCKPATH_LEN`] or
    /// the connection/read/write otherwise failed at the transport layer.
    #[error(transparent)]
    Transport(#[from] busybus_transport::TransportError),

    /// A received frame failed to decode, or an object didn't match its
    /// description.
    #[error(transparent)]
    Protocol(#[from] busybus_proto::ProtocolError),

    /// The daemon rejected this session's handshake (`SORJCT`).
    #[error("session-open rejected by daemon")]
    SessionRejected,

    /// The daemon replied with an unexpected message type for the session's
    /// state, or a reply the client has no matching pending request for.
    #[error("unexpected reply from daemon: {0}")]
    UnexpectedReply(String),

    /// `CLIREPLY` carried `NOMETHOD`.
    #[error("no such method: {0}")]
    NoMethod(String),

    /// `CLIREPLY` carried `METHODERR`.
    #[error("method invocation failed")]
    MethodError,

    /// `SRVACK` carried `MREGERR`.
    #[error("method registration rejected: {0}")]
    RegistrationError(String),

    /// A method or service path had no leaf component (no `.`), so there is
    /// no well-defined registration descriptor or SRVCALL meta for it (see
    /// the open question on top-level registration in the daemon).
    #[error("path has no leaf component: {0}")]
    NoLeafComponent(String),
}

impl ClientError {
    /// Map this error onto the thread-local error-code taxonomy and record
    /// it, returning `self` for chaining at the call site.
    pub(crate) fn record(self) -> Self {
        let code = match &self {
            Self::Transport(_) => ErrorCode::Io,
            Self::Protocol(_) => ErrorCode::Protocol,
            Self::SessionRejected => ErrorCode::SessionRejected,
            Self::UnexpectedReply(_) => ErrorCode::Protocol,
            Self::NoMethod(_) => ErrorCode::NoMethod,
            Self::MethodError => ErrorCode::MethodError,
            Self::RegistrationError(_) => ErrorCode::RegistrationError,
            Self::NoLeafComponent(_) => ErrorCode::InvalidArgument,
        };
        set_last_error(code);
        self
    }
}

/// Shorthand for results returned by this crate's public calls.
pub type Result<T> = std::result::Result<T, ClientError>;
