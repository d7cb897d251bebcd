//! Blocking control session: enumerate methods/clients, request shutdown.

use busybus_proto::{Message, MsgHeader, MsgType, SoType, Value};

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::sockpath;

/// A connected control client.
pub struct ControlClient {
    conn: Connection,
}

impl ControlClient {
    /// Connect to the daemon at the resolved socket path and open a
    /// control session under `name`.
    pub fn connect(name: &str) -> Result<Self> {
        Self::connect_to(&sockpath::resolve(), name)
    }

    /// Connect to an explicit socket path, bypassing [`sockpath::resolve`].
    pub fn connect_to(sockpath: &str, name: &str) -> Result<Self> {
        let conn = Connection::open(sockpath, SoType::Control, name).map_err(ClientError::record)?;
        Ok(Self { conn })
    }

    /// List every registered method's full dotted path.
    pub fn enumerate_methods(&mut self) -> Result<Vec<String>> {
        self.ctrl_strings("enumerate-methods").map_err(ClientError::record)
    }

    /// List the human name of every connected client that announced one.
    pub fn enumerate_clients(&mut self) -> Result<Vec<String>> {
        self.ctrl_strings("enumerate-clients").map_err(ClientError::record)
    }

    /// Ask the daemon to stop its main loop after draining pending actions.
    pub fn request_shutdown(&mut self) -> Result<()> {
        self.request_shutdown_inner().map_err(ClientError::record)
    }

    fn request_shutdown_inner(&mut self) -> Result<()> {
        self.send_ctrl("request-shutdown")?;
        self.conn.recv()?;
        Ok(())
    }

    fn ctrl_strings(&mut self, op: &str) -> Result<Vec<String>> {
        self.send_ctrl(op)?;
        let reply = self.conn.recv()?;
        let Ok(mut object) = reply.extractobj() else { return Ok(Vec::new()) };
        let values = object.parse("As")?;
        let Some(Value::A(items)) = values.into_iter().next() else {
            return Err(ClientError::UnexpectedReply(format!("malformed {op} reply")));
        };
        Ok(items
            .into_iter()
            .filter_map(|v| match v {
                Value::S(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                _ => None,
            })
            .collect())
    }

    fn send_ctrl(&mut self, op: &str) -> Result<()> {
        let (payload, flags) = Message::build_payload(Some(op), None);
        let mut header = MsgHeader::new(MsgType::Ctrl);
        header.set_flags(flags);
        let msg = Message::new(header, payload)?;
        self.conn.send(&msg)
    }

    /// Send CLOSE and tear the session down.
    pub fn close(self) {
        self.conn.close();
    }
}
