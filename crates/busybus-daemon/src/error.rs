//! Daemon-level error types: startup and main-loop failures that aren't
//! per-client (those never bubble up past the router, which returns actions
//! rather than errors).

use thiserror::Error;

/// Errors that can abort the daemon's startup or main loop.
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Couldn't bind or configure the listening socket.
    #[error("transport setup failed: {0}")]
    Transport(#[from] busybus_transport::TransportError),

    /// A registered built-in method collided with one already present.
    #[error("failed to register built-in method: {0}")]
    Registry(#[from] busybus_core::RegistryError),

    /// Couldn't install the `SIGINT`/`SIGTERM` shutdown-flag handlers.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}
