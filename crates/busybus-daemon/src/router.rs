//! Single-threaded router: owns every session, the method registry, the
//! pending-call table, and the monitor set. Pure action-pattern logic; the
//! runtime loop in `lib.rs`/`main.rs` is the only thing that touches a
//! socket.

use std::collections::{HashMap, HashSet};

use busybus_core::{
    registry::{RegDescriptor, SessionId},
    session::{ClientType, Session, SessionAction, SessionState},
    MethodEntry, PendingTable, Registry,
};
use busybus_proto::{ErrCode, Message, MsgHeader, MsgType, SoType};
use busybus_transport::PeerCredentials;

/// Events the runtime loop feeds to the router.
#[derive(Debug)]
pub enum RouterEvent {
    /// A new socket was accepted; `credentials` come from the transport's
    /// `SO_PEERCRED` read at accept time.
    Accepted { session: SessionId, credentials: PeerCredentials },
    /// One complete frame was read from `session`.
    MessageReceived { session: SessionId, message: Message },
    /// The socket for `session` hung up or hit a fatal I/O error.
    Disconnected { session: SessionId },
}

/// Actions the runtime loop must carry out.
#[derive(Debug)]
pub enum RouterAction {
    /// Write `message` to `session`'s socket.
    Send { session: SessionId, message: Message },
    /// Tear the socket for `session` down.
    Close { session: SessionId },
    /// A human-readable event for the ambient logger.
    Log { level: LogLevel, message: String },
    /// `request-shutdown` was accepted on a control session; the runtime
    /// loop should stop accepting new work and exit after draining actions.
    Shutdown,
}

/// Severity for [`RouterAction::Log`], mirrored onto `tracing` macros by the
/// runtime loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Fine-grained per-message detail.
    Debug,
    /// Normal operational events.
    Info,
    /// Recoverable, per-client problems.
    Warn,
    /// Problems that close a connection or fail a registration.
    Error,
}

/// A function registered as a local method (see [`crate::methods`]).
pub type LocalFn = busybus_core::registry::LocalFn;

/// Authorization hook: given the peer's credentials, may reject a handshake.
/// Defaults to always-accept.
pub type AuthHook = Box<dyn Fn(PeerCredentials) -> bool + Send>;

/// Owns all router-side state; produces actions from events.
pub struct Router {
    sessions: HashMap<SessionId, Session>,
    registry: Registry,
    pending: PendingTable,
    monitors: HashSet<SessionId>,
    auth_hook: AuthHook,
    shutdown_requested: bool,
}

impl Router {
    /// A fresh router with an empty registry and no connected clients.
    #[must_use]
    pub fn new() -> Self {
        Self::with_auth_hook(Box::new(|_creds| true))
    }

    /// A router whose handshake is gated by `auth_hook`.
    pub fn with_auth_hook(auth_hook: AuthHook) -> Self {
        Self {
            sessions: HashMap::new(),
            registry: Registry::new(),
            pending: PendingTable::new(),
            monitors: HashSet::new(),
            auth_hook,
            shutdown_requested: false,
        }
    }

    /// Register a built-in local method at `path`.
    pub fn register_local(&mut self, path: &str, f: LocalFn) -> Result<(), busybus_core::RegistryError> {
        self.registry.insert(path, MethodEntry::Local(f))
    }

    /// Whether `request-shutdown` has been accepted on a control session.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Number of currently-open sessions (any state).
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Dispatch one event, returning the actions the runtime loop must take.
    pub fn process_event(&mut self, event: RouterEvent) -> Vec<RouterAction> {
        match event {
            RouterEvent::Accepted { session, credentials } => {
                self.sessions.insert(session, Session::new());
                vec![RouterAction::Log {
                    level: LogLevel::Debug,
                    message: format!(
                        "session {session} accepted (pid={}, uid={})",
                        credentials.pid, credentials.uid
                    ),
                }]
            }
            RouterEvent::MessageReceived { session, message } => {
                self.handle_message(session, message)
            }
            RouterEvent::Disconnected { session } => self.teardown(session, "peer hangup"),
        }
    }

    fn handle_message(&mut self, session: SessionId, message: Message) -> Vec<RouterAction> {
        let Some(state) = self.sessions.get(&session).map(Session::state) else {
            return vec![RouterAction::Log {
                level: LogLevel::Warn,
                message: format!("message from unknown session {session}"),
            }];
        };

        match state {
            SessionState::Opening => self.handle_handshake(session, &message),
            SessionState::Open => self.handle_open_message(session, &message),
            SessionState::Closing | SessionState::Closed => {
                self.teardown(session, "message after close")
            }
        }
    }

    fn handle_handshake(&mut self, session: SessionId, message: &Message) -> Vec<RouterAction> {
        let header = message.header();
        if header.msgtype() != Some(MsgType::So) {
            return self.reject_unexpected(session, header.msgtype_raw());
        }

        let name = message.extractmeta();
        let authorized = true; // credentials were already checked at accept time.
        let sotype = header.sotype().unwrap_or(SoType::None);

        let Some(sess) = self.sessions.get_mut(&session) else { return Vec::new() };
        let result = sess.handle_so(sotype, name, authorized);

        match result {
            Ok(actions) => {
                let mut out = Vec::new();
                let became_open = self.sessions.get(&session).map(Session::state) == Some(SessionState::Open);
                if became_open && self.sessions.get(&session).and_then(Session::client_type) == Some(ClientType::Monitor) {
                    self.monitors.insert(session);
                }

                let closing = actions.iter().any(|a| matches!(a, SessionAction::Close));
                for action in actions {
                    out.extend(self.translate_session_action(session, action));
                }
                if closing {
                    self.monitors.remove(&session);
                    self.sessions.remove(&session);
                }
                out
            }
            Err(_) => self.teardown(session, "handshake rejected"),
        }
    }

    fn handle_open_message(&mut self, session: SessionId, message: &Message) -> Vec<RouterAction> {
        let mut actions = self.mirror_to_monitors(session, message);

        let client_type = self.sessions.get(&session).and_then(Session::client_type);
        let header = message.header();

        match (client_type, header.msgtype()) {
            (_, Some(MsgType::Close)) => {
                actions.extend(self.teardown(session, "peer sent CLOSE"));
            }
            (Some(ClientType::Caller), Some(MsgType::CliCall)) => {
                actions.extend(self.dispatch_call(session, message));
            }
            (Some(ClientType::Caller), Some(MsgType::CliSig)) => {
                actions.push(RouterAction::Log {
                    level: LogLevel::Debug,
                    message: format!("session {session}: CLISIG received, signals are not routed"),
                });
            }
            (Some(ClientType::Provider), Some(MsgType::SrvReg)) => {
                actions.extend(self.handle_srvreg(session, message));
            }
            (Some(ClientType::Provider), Some(MsgType::SrvUnreg)) => {
                actions.extend(self.handle_srvunreg(session));
            }
            (Some(ClientType::Provider), Some(MsgType::SrvReply)) => {
                actions.extend(self.handle_srvreply(session, message));
            }
            (Some(ClientType::Provider), Some(MsgType::SrvSig)) => {
                actions.push(RouterAction::Log {
                    level: LogLevel::Debug,
                    message: format!("session {session}: SRVSIG received, signals are not routed"),
                });
            }
            (Some(ClientType::Control), Some(MsgType::Ctrl)) => {
                actions.extend(self.handle_ctrl(session, message));
            }
            (_, Some(msgtype)) => {
                actions.extend(self.reject_unexpected(session, msgtype as u8));
            }
            (_, None) => {
                actions.extend(self.reject_unexpected(session, header.msgtype_raw()));
            }
        }

        actions
    }

    fn mirror_to_monitors(&self, origin: SessionId, message: &Message) -> Vec<RouterAction> {
        self.monitors
            .iter()
            .filter(|&&monitor| monitor != origin)
            .map(|&monitor| RouterAction::Send { session: monitor, message: clone_message(message) })
            .collect()
    }

    fn dispatch_call(&mut self, caller: SessionId, message: &Message) -> Vec<RouterAction> {
        let header = message.header();
        let token = header.token();
        let Some(path) = message.extractmeta() else {
            return vec![self.reply_clireply(caller, token, ErrCode::NoMethod, None)];
        };

        match self.registry.lookup(path) {
            Ok(MethodEntry::Local(f)) => {
                let f = *f;
                let mut object = match message.extractobj() {
                    Ok(obj) => obj,
                    Err(_) => busybus_proto::Object::frombuf(&[]),
                };
                match f(&mut object) {
                    Ok(result) => vec![self.reply_clireply(caller, token, ErrCode::Good, Some(result))],
                    Err(_) => vec![self.reply_clireply(caller, token, ErrCode::MethodErr, None)],
                }
            }
            Ok(MethodEntry::Remote { provider, leaf }) => {
                let provider = *provider;
                let leaf = leaf.clone();
                if !self.sessions.contains_key(&provider) {
                    return vec![self.reply_clireply(caller, token, ErrCode::MethodErr, None)];
                }

                let payload_object = message.extractobj().ok();
                let (payload, flags) = Message::build_payload(Some(leaf.as_str()), payload_object.as_ref());
                let mut srv_header = MsgHeader::new(MsgType::SrvCall);
                srv_header.set_token(token);
                srv_header.set_flags(flags);
                let Ok(srvcall) = Message::new(srv_header, payload) else {
                    return vec![self.reply_clireply(caller, token, ErrCode::MethodErr, None)];
                };

                self.pending.insert(provider, token, caller);
                vec![RouterAction::Send { session: provider, message: srvcall }]
            }
            Err(_) => vec![self.reply_clireply(caller, token, ErrCode::NoMethod, None)],
        }
    }

    #[allow(clippy::expect_used)]
    fn reply_clireply(
        &self,
        caller: SessionId,
        token: u32,
        errcode: ErrCode,
        object: Option<busybus_proto::Object>,
    ) -> RouterAction {
        let mut header = MsgHeader::new(MsgType::CliReply);
        header.set_token(token);
        header.set_errcode(errcode);
        let (payload, flags) = Message::build_payload(None, object.as_ref());
        header.set_flags(flags);
        let message = Message::new(header, payload).unwrap_or_else(|_| {
            let mut h = MsgHeader::new(MsgType::CliReply);
            h.set_token(token);
            h.set_errcode(ErrCode::MethodErr);
            Message::new(h, Vec::new()).expect("empty payload always fits")
        });
        RouterAction::Send { session: caller, message }
    }

    fn handle_srvreg(&mut self, provider: SessionId, message: &Message) -> Vec<RouterAction> {
        let Some(descriptor) = message.extractmeta() else {
            return vec![self.reply_srvack(provider, ErrCode::MRegErr)];
        };

        let outcome = busybus_core::parse_srvreg_descriptor(descriptor).and_then(|parsed: RegDescriptor<'_>| {
            self.registry.insert(
                &parsed.full_path,
                MethodEntry::Remote { provider, leaf: parsed.method_name.to_owned() },
            )
        });

        match outcome {
            Ok(()) => vec![self.reply_srvack(provider, ErrCode::Good)],
            Err(_) => vec![self.reply_srvack(provider, ErrCode::MRegErr)],
        }
    }

    fn handle_srvunreg(&mut self, provider: SessionId) -> Vec<RouterAction> {
        let removed = self.registry.remove_by_provider(provider);
        vec![
            self.reply_srvack(provider, ErrCode::Good),
            RouterAction::Log {
                level: LogLevel::Info,
                message: format!("provider {provider} unregistered {removed} method(s)"),
            },
        ]
    }

    #[allow(clippy::expect_used)]
    fn reply_srvack(&self, provider: SessionId, errcode: ErrCode) -> RouterAction {
        let mut header = MsgHeader::new(MsgType::SrvAck);
        header.set_errcode(errcode);
        let message = Message::new(header, Vec::new()).expect("empty payload always fits");
        RouterAction::Send { session: provider, message }
    }

    fn handle_srvreply(&mut self, provider: SessionId, message: &Message) -> Vec<RouterAction> {
        let header = message.header();
        let token = header.token();

        let Some(caller) = self.pending.take(provider, token) else {
            return vec![RouterAction::Log {
                level: LogLevel::Warn,
                message: format!("SRVREPLY from provider {provider} for unknown token {token}"),
            }];
        };

        if header.errcode() == Some(ErrCode::Good) {
            let object = message.extractobj().ok();
            vec![self.reply_clireply(caller, token, ErrCode::Good, object)]
        } else {
            vec![self.reply_clireply(caller, token, ErrCode::MethodErr, None)]
        }
    }

    fn handle_ctrl(&mut self, session: SessionId, message: &Message) -> Vec<RouterAction> {
        let op = message.extractmeta().unwrap_or("");
        match op {
            "enumerate-methods" => {
                let methods = self.registry.enumerate();
                vec![self.reply_ctrl_strings(session, &methods)]
            }
            "enumerate-clients" => {
                let names: Vec<String> = self
                    .sessions
                    .values()
                    .filter_map(|s| s.name().map(ToOwned::to_owned))
                    .collect();
                vec![self.reply_ctrl_strings(session, &names)]
            }
            "request-shutdown" => {
                self.shutdown_requested = true;
                vec![self.reply_ctrl_ack(session), RouterAction::Shutdown]
            }
            other => {
                vec![RouterAction::Log {
                    level: LogLevel::Warn,
                    message: format!("unknown control op {other:?} from session {session}"),
                }]
            }
        }
    }

    #[allow(clippy::expect_used)]
    fn reply_ctrl_ack(&self, session: SessionId) -> RouterAction {
        let header = MsgHeader::new(MsgType::Ctrl);
        let message = Message::new(header, Vec::new()).expect("empty payload always fits");
        RouterAction::Send { session, message }
    }

    #[allow(clippy::expect_used)]
    fn reply_ctrl_strings(&self, session: SessionId, items: &[String]) -> RouterAction {
        let descr = "As";
        let values = vec![busybus_proto::Value::A(
            items.iter().map(|s| busybus_proto::Value::S(s.as_bytes().to_vec())).collect(),
        )];
        let object = busybus_proto::Object::build(descr, &values).ok();
        let (payload, flags) = Message::build_payload(None, object.as_ref());
        let mut header = MsgHeader::new(MsgType::Ctrl);
        header.set_flags(flags);
        let message = Message::new(header, payload).unwrap_or_else(|_| {
            Message::new(MsgHeader::new(MsgType::Ctrl), Vec::new()).expect("empty payload always fits")
        });
        RouterAction::Send { session, message }
    }

    fn reject_unexpected(&mut self, session: SessionId, msgtype: u8) -> Vec<RouterAction> {
        if let Some(sess) = self.sessions.get_mut(&session) {
            let _ = sess.reject_unexpected(MsgType::from_u8(msgtype).unwrap_or(MsgType::Close));
        }
        self.teardown(session, "unexpected message type")
    }

    fn translate_session_action(&self, session: SessionId, action: SessionAction) -> Vec<RouterAction> {
        match action {
            SessionAction::Send(message) => vec![RouterAction::Send { session, message }],
            SessionAction::Close => vec![RouterAction::Close { session }],
        }
    }

    fn teardown(&mut self, session: SessionId, reason: &str) -> Vec<RouterAction> {
        let mut actions = vec![RouterAction::Close { session }];

        let was_provider =
            self.sessions.get(&session).and_then(Session::client_type) == Some(ClientType::Provider);

        if was_provider {
            let removed = self.registry.remove_by_provider(session);
            if removed > 0 {
                actions.push(RouterAction::Log {
                    level: LogLevel::Info,
                    message: format!("removed {removed} method(s) for disconnected provider {session}"),
                });
            }

            let orphaned = self.pending.remove_by_provider(session);
            for (caller, token) in orphaned {
                actions.push(self.reply_clireply(caller, token, ErrCode::MethodErr, None));
            }
        }

        self.monitors.remove(&session);
        self.sessions.remove(&session);

        actions.push(RouterAction::Log {
            level: LogLevel::Info,
            message: format!("session {session} closed: {reason}"),
        });
        actions
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::expect_used)]
fn clone_message(message: &Message) -> Message {
    Message::decode(&message.encode()).unwrap_or_else(|_| {
        Message::new(MsgHeader::new(MsgType::Mon), Vec::new()).expect("empty payload always fits")
    })
}

#[cfg(test)]
mod tests {
    use busybus_proto::{Object, Value};

    use super::*;

    fn handshake(router: &mut Router, session: SessionId, sotype: SoType, name: &str) {
        let mut header = MsgHeader::new(MsgType::So);
        header.set_sotype(sotype);
        header.set_flags(busybus_proto::FLAG_HAS_META);
        let mut payload = name.as_bytes().to_vec();
        payload.push(0);
        let message = Message::new(header, payload).unwrap();

        router.process_event(RouterEvent::Accepted {
            session,
            credentials: PeerCredentials { pid: 1, uid: 0, gid: 0 },
        });
        let actions =
            router.process_event(RouterEvent::MessageReceived { session, message });
        assert!(actions.iter().any(|a| matches!(a, RouterAction::Send { .. })));
    }

    fn clicall(token: u32, path: &str, arg: &str) -> Message {
        let object = Object::build("s", &[Value::S(arg.as_bytes().to_vec())]).unwrap();
        let (payload, flags) = Message::build_payload(Some(path), Some(&object));
        let mut header = MsgHeader::new(MsgType::CliCall);
        header.set_token(token);
        header.set_flags(flags);
        Message::new(header, payload).unwrap()
    }

    #[test]
    fn echo_like_local_method_replies_with_same_object() {
        let mut router = Router::new();
        router.register_local("bbus.bbusd.echo", busybus_core::echo).unwrap();

        handshake(&mut router, 1, SoType::Caller, "c1");
        let actions = router.process_event(RouterEvent::MessageReceived {
            session: 1,
            message: clicall(42, "bbus.bbusd.echo", "hello"),
        });

        let reply = actions
            .iter()
            .find_map(|a| match a {
                RouterAction::Send { session: 1, message } => Some(message),
                _ => None,
            })
            .expect("expected a CLIREPLY");

        assert_eq!(reply.header().msgtype(), Some(MsgType::CliReply));
        assert_eq!(reply.header().errcode(), Some(ErrCode::Good));
        assert_eq!(reply.header().token(), 42);
        let values = reply.extractobj().unwrap().parse("s").unwrap();
        assert_eq!(values, vec![Value::S(b"hello".to_vec())]);
    }

    #[test]
    fn unknown_method_replies_nomethod() {
        let mut router = Router::new();
        handshake(&mut router, 1, SoType::Caller, "c1");

        let actions = router.process_event(RouterEvent::MessageReceived {
            session: 1,
            message: clicall(1, "no.such.method", "x"),
        });

        let reply = actions
            .iter()
            .find_map(|a| match a {
                RouterAction::Send { session: 1, message } => Some(message),
                _ => None,
            })
            .unwrap();
        assert_eq!(reply.header().errcode(), Some(ErrCode::NoMethod));
    }

    #[test]
    fn call_to_remote_method_is_forwarded_and_reply_routed_back() {
        let mut router = Router::new();
        handshake(&mut router, 1, SoType::Caller, "c1");
        handshake(&mut router, 2, SoType::Provider, "p1");

        let mut reg_header = MsgHeader::new(MsgType::SrvReg);
        reg_header.set_flags(busybus_proto::FLAG_HAS_META);
        let mut descr = b"foo,bar,s,s".to_vec();
        descr.push(0);
        let reg_msg = Message::new(reg_header, descr).unwrap();
        let reg_actions =
            router.process_event(RouterEvent::MessageReceived { session: 2, message: reg_msg });
        assert!(reg_actions.iter().any(|a| matches!(
            a,
            RouterAction::Send { session: 2, message } if message.header().msgtype() == Some(MsgType::SrvAck)
                && message.header().errcode() == Some(ErrCode::Good)
        )));

        let call_actions = router.process_event(RouterEvent::MessageReceived {
            session: 1,
            message: clicall(7, "bbus.foo.bar", "X"),
        });
        let srvcall = call_actions
            .iter()
            .find_map(|a| match a {
                RouterAction::Send { session: 2, message } => Some(message),
                _ => None,
            })
            .expect("expected SRVCALL forwarded to provider");
        assert_eq!(srvcall.header().msgtype(), Some(MsgType::SrvCall));
        assert_eq!(srvcall.extractmeta(), Some("bar"));

        let mut reply_header = MsgHeader::new(MsgType::SrvReply);
        reply_header.set_token(7);
        reply_header.set_errcode(ErrCode::Good);
        let obj = Object::build("s", &[Value::S(b"x".to_vec())]).unwrap();
        let (payload, flags) = Message::build_payload(None, Some(&obj));
        reply_header.set_flags(flags);
        let reply_msg = Message::new(reply_header, payload).unwrap();

        let final_actions =
            router.process_event(RouterEvent::MessageReceived { session: 2, message: reply_msg });
        let clireply = final_actions
            .iter()
            .find_map(|a| match a {
                RouterAction::Send { session: 1, message } => Some(message),
                _ => None,
            })
            .expect("expected CLIREPLY routed to caller");
        assert_eq!(clireply.header().token(), 7);
        assert_eq!(clireply.header().errcode(), Some(ErrCode::Good));
    }

    #[test]
    fn provider_disconnect_mid_call_clears_pending_entry_and_notifies_caller() {
        let mut router = Router::new();
        handshake(&mut router, 1, SoType::Caller, "c1");
        handshake(&mut router, 2, SoType::Provider, "p1");

        let mut reg_header = MsgHeader::new(MsgType::SrvReg);
        reg_header.set_flags(busybus_proto::FLAG_HAS_META);
        let mut descr = b"foo,bar,s,s".to_vec();
        descr.push(0);
        router.process_event(RouterEvent::MessageReceived {
            session: 2,
            message: Message::new(reg_header, descr).unwrap(),
        });

        router.process_event(RouterEvent::MessageReceived {
            session: 1,
            message: clicall(3, "bbus.foo.bar", "X"),
        });
        assert_eq!(router.pending.len(), 1);

        let actions = router.process_event(RouterEvent::Disconnected { session: 2 });
        assert!(router.pending.is_empty());

        let error_reply = actions
            .iter()
            .find_map(|a| match a {
                RouterAction::Send { session: 1, message } => Some(message),
                _ => None,
            })
            .expect("caller should be notified of provider failure");
        assert_eq!(error_reply.header().errcode(), Some(ErrCode::MethodErr));
        assert_eq!(error_reply.header().token(), 3, "CLIREPLY must carry the caller's own CLICALL token");
    }

    #[test]
    fn monitor_observes_call_and_reply() {
        let mut router = Router::new();
        router.register_local("bbus.bbusd.echo", busybus_core::echo).unwrap();
        handshake(&mut router, 1, SoType::Caller, "c1");
        handshake(&mut router, 9, SoType::Monitor, "m1");

        let actions = router.process_event(RouterEvent::MessageReceived {
            session: 1,
            message: clicall(1, "bbus.bbusd.echo", "hi"),
        });

        let mirrored = actions
            .iter()
            .any(|a| matches!(a, RouterAction::Send { session: 9, message } if message.header().msgtype() == Some(MsgType::CliCall)));
        assert!(mirrored);
    }

    #[test]
    fn enumerate_methods_returns_registered_paths() {
        let mut router = Router::new();
        router.register_local("bbus.bbusd.echo", busybus_core::echo).unwrap();
        handshake(&mut router, 5, SoType::Control, "ctl");

        let mut header = MsgHeader::new(MsgType::Ctrl);
        header.set_flags(busybus_proto::FLAG_HAS_META);
        let mut payload = b"enumerate-methods".to_vec();
        payload.push(0);
        let actions = router.process_event(RouterEvent::MessageReceived {
            session: 5,
            message: Message::new(header, payload).unwrap(),
        });

        let reply = actions
            .iter()
            .find_map(|a| match a {
                RouterAction::Send { session: 5, message } => Some(message),
                _ => None,
            })
            .unwrap();
        let values = reply.extractobj().unwrap().parse("As").unwrap();
        assert_eq!(values, vec![Value::A(vec![Value::S(b"bbus.bbusd.echo".to_vec())])]);
    }

    #[test]
    fn request_shutdown_sets_flag_and_emits_shutdown_action() {
        let mut router = Router::new();
        handshake(&mut router, 5, SoType::Control, "ctl");

        let mut header = MsgHeader::new(MsgType::Ctrl);
        header.set_flags(busybus_proto::FLAG_HAS_META);
        let mut payload = b"request-shutdown".to_vec();
        payload.push(0);
        let actions = router.process_event(RouterEvent::MessageReceived {
            session: 5,
            message: Message::new(header, payload).unwrap(),
        });

        assert!(router.shutdown_requested());
        assert!(actions.iter().any(|a| matches!(a, RouterAction::Shutdown)));
    }
}
