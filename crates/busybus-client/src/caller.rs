//! Blocking caller session: `callmethod`-style call-and-wait.

use busybus_proto::{ErrCode, Message, MsgHeader, MsgType, Object, SoType};

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::sockpath;

/// A connected caller: mints its own correlation tokens and blocks on
/// [`Self::call`] until the matching `CLIREPLY` arrives.
pub struct CallerClient {
    conn: Connection,
    next_token: u32,
}

impl CallerClient {
    /// Connect to the daemon at the resolved socket path and open a caller
    /// session under `name`.
    pub fn connect(name: &str) -> Result<Self> {
        Self::connect_to(&sockpath::resolve(), name)
    }

    /// Connect to an explicit socket path, bypassing [`sockpath::resolve`].
    pub fn connect_to(sockpath: &str, name: &str) -> Result<Self> {
        let conn = Connection::open(sockpath, SoType::Caller, name).map_err(ClientError::record)?;
        Ok(Self { conn, next_token: 0 })
    }

    /// Mint the next correlation token: monotonic, wrapping at `u32::MAX`
    /// while skipping zero, mirroring the router's own per-session counter.
    fn next_token(&mut self) -> u32 {
        self.next_token = advance_token(self.next_token);
        self.next_token
    }

    /// Call `path` with `arg` and block for the reply. Returns the
    /// provider's result object, or `None` if the method returns nothing.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoMethod`] if the path doesn't resolve to anything,
    /// [`ClientError::MethodError`] if the method (local or remote) failed.
    pub fn call(&mut self, path: &str, arg: Option<&Object>) -> Result<Option<Object>> {
        self.call_inner(path, arg).map_err(ClientError::record)
    }

    fn call_inner(&mut self, path: &str, arg: Option<&Object>) -> Result<Option<Object>> {
        let token = self.next_token();
        let (payload, flags) = Message::build_payload(Some(path), arg);
        let mut header = MsgHeader::new(MsgType::CliCall);
        header.set_token(token);
        header.set_flags(flags);
        let call = Message::new(header, payload)?;
        self.conn.send(&call)?;

        let reply = self.conn.recv()?;
        let reply_header = reply.header();
        if reply_header.msgtype() != Some(MsgType::CliReply) {
            return Err(ClientError::UnexpectedReply(format!(
                "expected CLIREPLY, got {:?}",
                reply_header.msgtype()
            )));
        }
        if reply_header.token() != token {
            return Err(ClientError::UnexpectedReply(format!(
                "reply token {} doesn't match call token {token}",
                reply_header.token()
            )));
        }

        match reply_header.errcode() {
            Some(ErrCode::Good) => Ok(reply.extractobj().ok()),
            Some(ErrCode::NoMethod) => Err(ClientError::NoMethod(path.to_owned())),
            Some(ErrCode::MethodErr) => Err(ClientError::MethodError),
            _ => Err(ClientError::UnexpectedReply("missing or unknown errcode".to_owned())),
        }
    }

    /// Send CLOSE and tear the session down.
    pub fn close(self) {
        self.conn.close();
    }
}

fn advance_token(current: u32) -> u32 {
    if current == u32::MAX { 1 } else { current + 1 }
}
