//! Blocking provider session: register a method, then serve `SRVCALL`s.

use busybus_proto::{ErrCode, Message, MsgHeader, MsgType, Object, SoType};

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::sockpath;

/// A connected provider, before or after registering its methods.
pub struct ProviderClient {
    conn: Connection,
}

/// A handler invoked once per `SRVCALL`: the leaf method name and the
/// caller's argument object, returning the result object or a failure.
pub trait MethodHandler {
    /// Handle one call; `Err` maps to `SRVREPLY` `METHODERR`.
    fn invoke(&mut self, leaf: &str, arg: Object) -> std::result::Result<Object, String>;
}

impl<F> MethodHandler for F
where
    F: FnMut(&str, Object) -> std::result::Result<Object, String>,
{
    fn invoke(&mut self, leaf: &str, arg: Object) -> std::result::Result<Object, String> {
        self(leaf, arg)
    }
}

impl ProviderClient {
    /// Connect to the daemon at the resolved socket path and open a
    /// provider session under `name`.
    pub fn connect(name: &str) -> Result<Self> {
        Self::connect_to(&sockpath::resolve(), name)
    }

    /// Connect to an explicit socket path, bypassing [`sockpath::resolve`].
    pub fn connect_to(sockpath: &str, name: &str) -> Result<Self> {
        let conn = Connection::open(sockpath, SoType::Provider, name).map_err(ClientError::record)?;
        Ok(Self { conn })
    }

    /// Register `bbus.<service_path>.<method_name>`, described by
    /// `arg_descr`/`ret_descr` (the comma-separated `SRVREG` registration
    /// descriptor the daemon parses into a full path).
    ///
    /// `service_path` must contain at least one component; a bare method
    /// name with no service prefix is rejected to avoid the source's
    /// unspecified top-level-registration behavior.
    pub fn register(
        &mut self,
        service_path: &str,
        method_name: &str,
        arg_descr: &str,
        ret_descr: &str,
    ) -> Result<()> {
        self.register_inner(service_path, method_name, arg_descr, ret_descr).map_err(ClientError::record)
    }

    fn register_inner(
        &mut self,
        service_path: &str,
        method_name: &str,
        arg_descr: &str,
        ret_descr: &str,
    ) -> Result<()> {
        if service_path.is_empty() {
            return Err(ClientError::NoLeafComponent(method_name.to_owned()));
        }

        let descriptor = format!("{service_path},{method_name},{arg_descr},{ret_descr}");
        let (payload, flags) = Message::build_payload(Some(&descriptor), None);
        let mut header = MsgHeader::new(MsgType::SrvReg);
        header.set_flags(flags);
        let msg = Message::new(header, payload)?;
        self.conn.send(&msg)?;

        self.expect_ack(&descriptor)
    }

    /// Unregister every method this provider published.
    pub fn unregister(&mut self) -> Result<()> {
        self.unregister_inner().map_err(ClientError::record)
    }

    fn unregister_inner(&mut self) -> Result<()> {
        let msg = Message::new(MsgHeader::new(MsgType::SrvUnreg), Vec::new())?;
        self.conn.send(&msg)?;
        self.expect_ack("unregister")
    }

    fn expect_ack(&mut self, what: &str) -> Result<()> {
        let reply = self.conn.recv()?;
        if reply.header().msgtype() != Some(MsgType::SrvAck) {
            return Err(ClientError::UnexpectedReply(format!(
                "expected SRVACK, got {:?}",
                reply.header().msgtype()
            )));
        }
        match reply.header().errcode() {
            Some(ErrCode::Good) => Ok(()),
            _ => Err(ClientError::RegistrationError(what.to_owned())),
        }
    }

    /// Block forever, serving one `SRVCALL` per iteration through `handler`.
    /// Returns only on a connection-level error (the daemon hung up, a
    /// malformed frame, etc).
    pub fn run(&mut self, mut handler: impl MethodHandler) -> Result<()> {
        loop {
            self.serve_one(&mut handler)?;
        }
    }

    /// Serve exactly one `SRVCALL`, blocking until it arrives.
    pub fn serve_one(&mut self, handler: &mut impl MethodHandler) -> Result<()> {
        self.serve_one_inner(handler).map_err(ClientError::record)
    }

    fn serve_one_inner(&mut self, handler: &mut impl MethodHandler) -> Result<()> {
        let call = self.conn.recv()?;
        let header = call.header();
        if header.msgtype() != Some(MsgType::SrvCall) {
            return Err(ClientError::UnexpectedReply(format!(
                "expected SRVCALL, got {:?}",
                header.msgtype()
            )));
        }
        let token = header.token();
        let leaf = call.extractmeta().unwrap_or("").to_owned();
        let arg = call.extractobj().unwrap_or_else(|_| Object::frombuf(&[]));

        let (errcode, object) = match handler.invoke(&leaf, arg) {
            Ok(result) => (ErrCode::Good, Some(result)),
            Err(_) => (ErrCode::MethodErr, None),
        };

        let (payload, flags) = Message::build_payload(None, object.as_ref());
        let mut reply_header = MsgHeader::new(MsgType::SrvReply);
        reply_header.set_token(token);
        reply_header.set_errcode(errcode);
        reply_header.set_flags(flags);
        let reply = Message::new(reply_header, payload)?;
        self.conn.send(&reply)
    }

    /// Send CLOSE and tear the session down.
    pub fn close(self) {
        self.conn.close();
    }
}
