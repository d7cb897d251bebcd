//! Blocking monitor session: receives a copy of every message the router
//! observes, in daemon-observation order.

use busybus_proto::{Message, SoType};

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::sockpath;

/// A connected monitor.
pub struct MonitorClient {
    conn: Connection,
}

impl MonitorClient {
    /// Connect to the daemon at the resolved socket path and open a
    /// monitor session under `name`.
    pub fn connect(name: &str) -> Result<Self> {
        Self::connect_to(&sockpath::resolve(), name)
    }

    /// Connect to an explicit socket path, bypassing [`sockpath::resolve`].
    pub fn connect_to(sockpath: &str, name: &str) -> Result<Self> {
        let conn = Connection::open(sockpath, SoType::Monitor, name).map_err(ClientError::record)?;
        Ok(Self { conn })
    }

    /// Block until the next mirrored frame arrives.
    pub fn recv_next(&mut self) -> Result<Message> {
        self.conn.recv().map_err(ClientError::record)
    }

    /// Send CLOSE and tear the session down.
    pub fn close(self) {
        self.conn.close();
    }
}
