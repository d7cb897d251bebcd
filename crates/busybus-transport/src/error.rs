//! Transport-level I/O errors.

use thiserror::Error;

/// Errors raised by the Unix domain socket primitives.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The peer closed the connection before `recv_exact` got all the bytes
    /// it asked for.
    #[error("connection closed: got {got} of {want} bytes")]
    ConnectionClosed {
        /// Bytes actually read before EOF.
        got: usize,
        /// Bytes the caller asked for.
        want: usize,
    },

    /// A single non-blocking read returned fewer bytes than expected
    /// without hitting EOF (shouldn't happen given `recv_exact`'s
    /// readiness-gated loop, but surfaced distinctly rather than folded
    /// into an `io::Error`).
    #[error("received less than expected: got {got} of {want} bytes")]
    ShortRead {
        /// Bytes actually read.
        got: usize,
        /// Bytes the caller asked for.
        want: usize,
    },

    /// `send_all` could not write every byte.
    #[error("sent less than expected: wrote {wrote} of {want} bytes")]
    ShortWrite {
        /// Bytes actually written.
        wrote: usize,
        /// Bytes the caller asked to write.
        want: usize,
    },

    /// `poll_ready`'s underlying poll call was interrupted by a signal.
    /// Distinguished so callers (the router's main loop) can treat it as
    /// transparent and simply poll again.
    #[error("poll interrupted by a signal")]
    PollInterrupted,

    /// A socket path exceeded the 256-byte limit.
    #[error("socket path too long: {len} bytes, max 256")]
    PathTooLong {
        /// Length of the rejected path.
        len: usize,
    },

    /// Any other OS-level failure (bind, accept, getsockopt, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `nix` syscall wrapper failed outside the cases above.
    #[error("system call failed: {0}")]
    Errno(#[from] nix::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TransportError>;
