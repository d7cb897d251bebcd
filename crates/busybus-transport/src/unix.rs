//! Unix domain stream socket primitives: listen/accept/connect, readiness
//! polling, and exact-size read/write helpers.
//!
//! All sockets are put into non-blocking mode as soon as they're created;
//! callers gate reads and writes on [`poll_ready`] rather than relying on
//! blocking semantics. `SIGPIPE` needs no explicit suppression here: Rust's
//! standard runtime already installs `SIG_IGN` for it before `main` runs, so
//! a broken pipe surfaces as an `EPIPE` write error rather than a signal.

use std::fs;
use std::os::fd::AsFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::time::{Duration, Instant};

use nix::poll::{PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{getsockopt, sockopt::PeerCredentials as PeerCredSockopt};

use crate::error::{Result, TransportError};

/// Hard cap on socket path length.
pub const MAX_SOCKPATH_LEN: usize = 256;

/// Default socket path, absent an override.
pub const DEFAULT_SOCKPATH: &str = "/tmp/bbus.sock";

/// The router's poll period: how long a single `poll_ready` call blocks
/// before returning to let the main loop check for other work.
pub const DEFAULT_POLL_TIMEOUT_MS: u16 = 500;

/// Bound on how long `recv_exact`/`send_all` retry against a non-blocking
/// socket that keeps reporting "would block" mid-message, before giving up
/// with a short-read/short-write error. The router only calls these after
/// `poll_ready` reports the socket readable, so this guards against a peer
/// that stalls partway through a frame rather than the common case.
const PARTIAL_IO_RETRY_BUDGET: Duration = Duration::from_millis(200);

fn check_path_len(path: &str) -> Result<()> {
    if path.len() > MAX_SOCKPATH_LEN {
        return Err(TransportError::PathTooLong { len: path.len() });
    }
    Ok(())
}

/// Peer credentials captured at accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    /// Peer process ID.
    pub pid: i32,
    /// Peer's effective user ID.
    pub uid: u32,
    /// Peer's effective group ID.
    pub gid: u32,
}

/// Unlink any stale socket file at `path`, then bind and listen.
pub fn listen(path: &str, backlog: i32) -> Result<UnixListener> {
    check_path_len(path)?;

    if Path::new(path).exists() {
        fs::remove_file(path)?;
    }

    let listener = UnixListener::bind(path)?;
    listener.set_nonblocking(true)?;
    // std's UnixListener::bind always picks a kernel-chosen backlog; there's
    // no way to plumb a caller-chosen one through without building the
    // socket by hand, so this is accepted for interface symmetry only.
    let _ = backlog;

    Ok(listener)
}

/// Accept one pending connection and read its peer credentials.
pub fn accept(listener: &UnixListener) -> Result<(UnixStream, PeerCredentials)> {
    let (stream, _addr) = listener.accept()?;
    stream.set_nonblocking(true)?;
    let creds = peer_credentials(&stream)?;
    Ok((stream, creds))
}

/// Connect to a listening daemon (client side).
pub fn connect(path: &str) -> Result<UnixStream> {
    check_path_len(path)?;
    let stream = UnixStream::connect(path)?;
    stream.set_nonblocking(true)?;
    Ok(stream)
}

/// Read the credentials of the process on the other end of `stream`.
/// Linux-only: `SO_PEERCRED` has no portable equivalent, and busybus's
/// local-socket daemon targets Linux.
pub fn peer_credentials(stream: &UnixStream) -> Result<PeerCredentials> {
    let cred = getsockopt(stream, PeerCredSockopt)?;
    Ok(PeerCredentials { pid: cred.pid(), uid: cred.uid(), gid: cred.gid() })
}

/// Poll a set of handles for readability, returning one bool per input in
/// the same order. `EINTR` surfaces as [`TransportError::PollInterrupted`]
/// so the router's main loop can treat it as transparent.
pub fn poll_ready(targets: &[&dyn AsFd], timeout_ms: u16) -> Result<Vec<bool>> {
    let mut pollfds: Vec<PollFd<'_>> =
        targets.iter().map(|t| PollFd::new(t.as_fd(), PollFlags::POLLIN)).collect();

    let timeout = PollTimeout::from(timeout_ms);
    match nix::poll::poll(&mut pollfds, timeout) {
        Ok(_) => {}
        Err(nix::errno::Errno::EINTR) => return Err(TransportError::PollInterrupted),
        Err(e) => return Err(TransportError::Errno(e)),
    }

    Ok(pollfds
        .iter()
        .map(|pfd| pfd.revents().is_some_and(|r| r.contains(PollFlags::POLLIN)))
        .collect())
}

/// Read exactly `buf.len()` bytes, looping over non-blocking reads.
pub fn recv_exact(stream: &mut UnixStream, buf: &mut [u8]) -> Result<()> {
    use std::io::Read;

    let want = buf.len();
    let mut filled = 0;
    let deadline = Instant::now() + PARTIAL_IO_RETRY_BUDGET;

    while filled < want {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(TransportError::ConnectionClosed { got: filled, want }),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(TransportError::ShortRead { got: filled, want });
                }
                std::thread::yield_now();
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(TransportError::Io(e)),
        }
    }

    Ok(())
}

/// Write every byte of `buf`, looping over non-blocking writes.
pub fn send_all(stream: &mut UnixStream, buf: &[u8]) -> Result<()> {
    use std::io::Write;

    let want = buf.len();
    let mut sent = 0;
    let deadline = Instant::now() + PARTIAL_IO_RETRY_BUDGET;

    while sent < want {
        match stream.write(&buf[sent..]) {
            Ok(0) => return Err(TransportError::ShortWrite { wrote: sent, want }),
            Ok(n) => sent += n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(TransportError::ShortWrite { wrote: sent, want });
                }
                std::thread::yield_now();
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(TransportError::Io(e)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixListener as StdUnixListener;

    use super::*;

    fn temp_sock_path(name: &str) -> String {
        format!("{}/busybus-test-{name}-{}.sock", std::env::temp_dir().display(), std::process::id())
    }

    #[test]
    fn listen_removes_stale_socket_file() {
        let path = temp_sock_path("stale");
        let _ = fs::remove_file(&path);
        StdUnixListener::bind(&path).unwrap();
        assert!(Path::new(&path).exists());

        let listener = listen(&path, 16).unwrap();
        assert!(Path::new(&path).exists());
        drop(listener);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn connect_and_accept_round_trip() {
        let path = temp_sock_path("roundtrip");
        let _ = fs::remove_file(&path);
        let listener = listen(&path, 16).unwrap();

        let mut client = connect(&path).unwrap();

        // Give the kernel a moment to queue the connection for accept.
        std::thread::sleep(Duration::from_millis(20));
        let (mut server_side, _creds) = accept(&listener).unwrap();

        send_all(&mut client, b"hello").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let mut buf = [0u8; 5];
        recv_exact(&mut server_side, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_overlong_path() {
        let path = "a".repeat(MAX_SOCKPATH_LEN + 1);
        assert!(matches!(listen(&path, 16), Err(TransportError::PathTooLong { .. })));
        assert!(matches!(connect(&path), Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn poll_ready_reports_readable_listener_after_connect() {
        let path = temp_sock_path("poll");
        let _ = fs::remove_file(&path);
        let listener = listen(&path, 16).unwrap();
        let _client = connect(&path).unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let ready = poll_ready(&[&listener], DEFAULT_POLL_TIMEOUT_MS).unwrap();
        assert_eq!(ready, vec![true]);

        let _ = fs::remove_file(&path);
    }
}
