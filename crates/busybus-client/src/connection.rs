//! Blocking low-level connection: the session-open handshake, framed
//! send/recv, and graceful close. Every client role (caller, provider,
//! monitor, control) is a thin wrapper around one of these.

use std::os::unix::net::UnixStream;
use std::time::Duration;

use busybus_proto::{Message, MsgHeader, MsgType, SoType};
use busybus_transport::TransportError;

use crate::error::{ClientError, Result};

/// How long a single readiness poll blocks while waiting for a reply.
/// Calls are blocking from the application's point of view: this is just
/// the granularity at which the wait loop re-checks for a signal having
/// interrupted the previous poll, not a call timeout.
const POLL_MS: u16 = 500;

/// A handshaked socket: framed send/recv plus the CLOSE handshake.
pub struct Connection {
    stream: UnixStream,
}

impl Connection {
    /// Connect to `sockpath` and perform the session-open handshake,
    /// announcing `name` (truncated to
    /// [`busybus_core::session::MAX_NAME_LEN`] bytes by the daemon) as the
    /// given `sotype`.
    pub fn open(sockpath: &str, sotype: SoType, name: &str) -> Result<Self> {
        let stream = busybus_transport::connect(sockpath).map_err(ClientError::from)?;
        let mut conn = Self { stream };

        let (payload, flags) = Message::build_payload(Some(name), None);
        let mut header = MsgHeader::new(MsgType::So);
        header.set_sotype(sotype);
        header.set_flags(flags);
        let so = Message::new(header, payload)?;
        conn.send(&so)?;

        let reply = conn.recv()?;
        match reply.header().msgtype() {
            Some(MsgType::SoOk) => Ok(conn),
            Some(MsgType::SoRjct) => Err(ClientError::SessionRejected),
            other => Err(ClientError::UnexpectedReply(format!("expected SOOK/SORJCT, got {other:?}"))),
        }
    }

    /// Send one framed message, blocking until every byte is written.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        busybus_transport::send_all(&mut self.stream, &message.encode()).map_err(ClientError::from)
    }

    /// Block until one complete framed message has been read.
    pub fn recv(&mut self) -> Result<Message> {
        self.wait_readable()?;

        let mut header_buf = [0u8; MsgHeader::SIZE];
        busybus_transport::recv_exact(&mut self.stream, &mut header_buf).map_err(ClientError::from)?;
        let header = MsgHeader::from_bytes(&header_buf)?;

        let mut payload = vec![0u8; usize::from(header.psize())];
        if !payload.is_empty() {
            self.wait_readable()?;
            busybus_transport::recv_exact(&mut self.stream, &mut payload).map_err(ClientError::from)?;
        }

        let mut bytes = header_buf.to_vec();
        bytes.extend_from_slice(&payload);
        Message::decode(&bytes).map_err(ClientError::from)
    }

    /// Block, re-polling every [`POLL_MS`], until the socket has bytes
    /// ready to read. `EINTR` is transparent, matching the daemon's main
    /// loop.
    fn wait_readable(&self) -> Result<()> {
        loop {
            match busybus_transport::poll_ready(&[&self.stream], POLL_MS) {
                Ok(ready) if ready.first().copied().unwrap_or(false) => return Ok(()),
                Ok(_) => std::thread::sleep(Duration::from_millis(1)),
                Err(TransportError::PollInterrupted) => {}
                Err(e) => return Err(ClientError::from(e)),
            }
        }
    }

    /// Send CLOSE and drop the socket. Errors sending CLOSE are ignored:
    /// the peer will observe the hangup either way.
    pub fn close(mut self) {
        let close = Message::new(MsgHeader::new(MsgType::Close), Vec::new());
        if let Ok(close) = close {
            let _ = self.send(&close);
        }
    }
}
