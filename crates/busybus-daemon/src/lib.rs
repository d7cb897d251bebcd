//! The busybus daemon (`bbusd`): production glue wiring `busybus-transport`'s
//! Unix-socket primitives to [`Router`]'s action-pattern core.
//!
//! The router owns every bit of routing logic and is pure; this crate's only
//! job is the readiness loop that feeds it events and carries out the
//! actions it returns.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod methods;
pub mod router;

use std::collections::HashMap;
use std::os::fd::AsFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use busybus_core::registry::SessionId;
use busybus_proto::{Message, MsgHeader};
use busybus_transport as transport;
use busybus_transport::TransportError;

pub use error::DaemonError;
pub use router::{AuthHook, LogLevel, Router, RouterAction, RouterEvent};

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Unix socket path to listen on.
    pub sockpath: String,
    /// How long a single readiness poll blocks, in milliseconds.
    pub poll_timeout_ms: u16,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sockpath: transport::DEFAULT_SOCKPATH.to_owned(),
            poll_timeout_ms: transport::DEFAULT_POLL_TIMEOUT_MS,
        }
    }
}

/// The running daemon: the listening socket, every connected client's
/// stream, and the router.
pub struct Daemon {
    listener: UnixListener,
    streams: HashMap<SessionId, UnixStream>,
    router: Router,
    next_session: SessionId,
    poll_timeout_ms: u16,
    run_flag: Arc<AtomicBool>,
}

impl Daemon {
    /// Bind the listening socket and register the built-in method table,
    /// accepting every handshake unconditionally.
    pub fn bind(config: DaemonConfig) -> Result<Self, DaemonError> {
        Self::bind_with_auth_hook(config, Box::new(|_creds| true))
    }

    /// Bind the listening socket with a caller-supplied authorization hook,
    /// consulted against each connection's peer credentials at handshake
    /// time.
    pub fn bind_with_auth_hook(config: DaemonConfig, auth_hook: AuthHook) -> Result<Self, DaemonError> {
        let listener = transport::listen(&config.sockpath, 128)?;
        let mut router = Router::with_auth_hook(auth_hook);
        methods::register_builtins(&mut router)?;

        Ok(Self {
            listener,
            streams: HashMap::new(),
            router,
            next_session: 1,
            poll_timeout_ms: config.poll_timeout_ms,
            run_flag: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Number of currently-connected clients.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.router.session_count()
    }

    /// Register `SIGINT`/`SIGTERM` handlers that clear the run-flag
    /// [`Self::run`] checks between poll cycles. This is distinct from the
    /// CTRL `request-shutdown` mechanism: a signal sets a flag a handler can
    /// touch safely (no allocation, no locks), observed the next time the
    /// main loop comes up for air, rather than routing a protocol message.
    pub fn install_signal_handlers(&mut self) -> Result<(), DaemonError> {
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&self.run_flag))?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&self.run_flag))?;
        Ok(())
    }

    /// Run the readiness loop until a control session's `request-shutdown`
    /// is accepted or the run-flag (see [`Self::install_signal_handlers`])
    /// is cleared.
    pub fn run(&mut self) -> Result<(), DaemonError> {
        while !self.router.shutdown_requested() && self.run_flag.load(Ordering::Relaxed) {
            self.poll_once()?;
        }
        Ok(())
    }

    /// One readiness-poll iteration: accept at most one new connection,
    /// service every readable stream, and carry out the router's actions.
    fn poll_once(&mut self) -> Result<(), DaemonError> {
        let mut session_ids: Vec<SessionId> = self.streams.keys().copied().collect();
        session_ids.sort_unstable();

        let mut targets: Vec<&dyn AsFd> = Vec::with_capacity(1 + session_ids.len());
        targets.push(&self.listener);
        for id in &session_ids {
            targets.push(self.streams.get(id).expect("id came from streams' own key set"));
        }

        let ready = match transport::poll_ready(&targets, self.poll_timeout_ms) {
            Ok(ready) => ready,
            Err(TransportError::PollInterrupted) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        drop(targets);

        if ready.first().copied().unwrap_or(false) {
            self.accept_until_exhausted();
        }

        for (readable, id) in ready.into_iter().skip(1).zip(session_ids) {
            if readable {
                self.service(id);
            }
        }

        Ok(())
    }

    /// The listener was readable at least once this cycle; Unix accept
    /// backlogs can hold more than one pending connection at a time, so keep
    /// accepting until the listener reports it would block rather than
    /// stopping after the first.
    fn accept_until_exhausted(&mut self) {
        loop {
            let (stream, credentials) = match transport::accept(&self.listener) {
                Ok(pair) => pair,
                Err(TransportError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::warn!("accept failed: {e}");
                    return;
                }
            };

            let session = self.next_session;
            self.next_session += 1;
            self.streams.insert(session, stream);

            let actions = self.router.process_event(RouterEvent::Accepted { session, credentials });
            self.execute(actions);
        }
    }

    fn service(&mut self, session: SessionId) {
        let message = match self.read_message(session) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(reason) => {
                tracing::warn!("session {session}: {reason}");
                self.disconnect(session);
                return;
            }
        };

        let actions = self.router.process_event(RouterEvent::MessageReceived { session, message });
        self.execute(actions);
    }

    /// Read one complete frame from `session`'s stream. `Ok(None)` means the
    /// peer hung up cleanly and [`Self::disconnect`] has already run.
    fn read_message(&mut self, session: SessionId) -> Result<Option<Message>, TransportError> {
        let mut header_buf = [0u8; MsgHeader::SIZE];
        let Some(stream) = self.streams.get_mut(&session) else { return Ok(None) };
        match transport::recv_exact(stream, &mut header_buf) {
            Ok(()) => {}
            Err(TransportError::ConnectionClosed { got: 0, .. }) => {
                self.disconnect(session);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let header = MsgHeader::from_bytes(&header_buf)
            .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))?;

        let mut payload = vec![0u8; usize::from(header.psize())];
        if !payload.is_empty() {
            let stream = self.streams.get_mut(&session).expect("session still present");
            transport::recv_exact(stream, &mut payload)?;
        }

        let mut bytes = header_buf.to_vec();
        bytes.extend_from_slice(&payload);
        Message::decode(&bytes)
            .map(Some)
            .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))
    }

    fn disconnect(&mut self, session: SessionId) {
        self.streams.remove(&session);
        let actions = self.router.process_event(RouterEvent::Disconnected { session });
        self.execute(actions);
    }

    fn execute(&mut self, actions: Vec<RouterAction>) {
        for action in actions {
            match action {
                RouterAction::Send { session, message } => {
                    if let Some(stream) = self.streams.get_mut(&session) {
                        if let Err(e) = transport::send_all(stream, &message.encode()) {
                            tracing::warn!("session {session}: send failed: {e}");
                            self.streams.remove(&session);
                        }
                    }
                }
                RouterAction::Close { session } => {
                    self.streams.remove(&session);
                }
                RouterAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{message}"),
                    LogLevel::Info => tracing::info!("{message}"),
                    LogLevel::Warn => tracing::warn!("{message}"),
                    LogLevel::Error => tracing::error!("{message}"),
                },
                RouterAction::Shutdown => tracing::info!("shutdown requested, draining main loop"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixStream as StdUnixStream;

    use super::*;

    fn temp_sock_path(name: &str) -> String {
        format!("{}/busybus-daemon-test-{name}-{}.sock", std::env::temp_dir().display(), std::process::id())
    }

    #[test]
    fn bind_registers_echo_and_accepts_nothing_yet() {
        let path = temp_sock_path("bind");
        let _ = std::fs::remove_file(&path);
        let config = DaemonConfig { sockpath: path.clone(), poll_timeout_ms: 10 };
        let daemon = Daemon::bind(config).unwrap();
        assert_eq!(daemon.session_count(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn clearing_the_run_flag_stops_the_loop() {
        let path = temp_sock_path("runflag");
        let _ = std::fs::remove_file(&path);
        let config = DaemonConfig { sockpath: path.clone(), poll_timeout_ms: 10 };
        let mut daemon = Daemon::bind(config).unwrap();

        daemon.run_flag.store(false, Ordering::Relaxed);
        daemon.run().unwrap();

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn poll_once_accepts_a_pending_connection() {
        let path = temp_sock_path("accept");
        let _ = std::fs::remove_file(&path);
        let config = DaemonConfig { sockpath: path.clone(), poll_timeout_ms: 50 };
        let mut daemon = Daemon::bind(config).unwrap();

        let _client = StdUnixStream::connect(&path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        daemon.poll_once().unwrap();

        assert_eq!(daemon.session_count(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn poll_once_drains_every_pending_connection_in_one_cycle() {
        let path = temp_sock_path("accept-burst");
        let _ = std::fs::remove_file(&path);
        let config = DaemonConfig { sockpath: path.clone(), poll_timeout_ms: 50 };
        let mut daemon = Daemon::bind(config).unwrap();

        let _clients: Vec<_> = (0..5).map(|_| StdUnixStream::connect(&path).unwrap()).collect();
        std::thread::sleep(std::time::Duration::from_millis(20));
        daemon.poll_once().unwrap();

        assert_eq!(daemon.session_count(), 5);
        let _ = std::fs::remove_file(&path);
    }
}
