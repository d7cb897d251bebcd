//! Per-session state machine: `OPENING → OPEN → CLOSING → CLOSED`.
//!
//! Like the wire codec below it, this is a pure action-pattern state
//! machine: methods take an event, mutate `self`, and return the
//! [`SessionAction`]s the router must carry out. No socket I/O happens here.

use busybus_proto::{Message, MsgHeader, MsgType, SoType};

use crate::error::SessionError;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, no SO yet.
    Opening,
    /// Handshake completed; type-appropriate messages are handled.
    Open,
    /// A CLOSE was sent or received; the session is being torn down.
    Closing,
    /// Removed from the multiplex set.
    Closed,
}

/// What the router must do after feeding a session an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write this message to the session's socket.
    Send(Message),
    /// Remove the session from the multiplex set. For a provider, the
    /// router must also run remove-by-provider on the registry and GC its
    /// pending calls.
    Close,
}

/// The typed role a session took on during its handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientType {
    /// Calls methods and waits for replies.
    Caller,
    /// Publishes methods, receives SRVCALL, sends SRVREPLY.
    Provider,
    /// Receives a copy of every routed message.
    Monitor,
    /// Issues CTRL commands.
    Control,
}

impl ClientType {
    /// Map from the wire `sotype` byte, rejecting `SoType::None`.
    #[must_use]
    pub fn from_sotype(sotype: SoType) -> Option<Self> {
        match sotype {
            SoType::Caller => Some(Self::Caller),
            SoType::Provider => Some(Self::Provider),
            SoType::Monitor => Some(Self::Monitor),
            SoType::Control => Some(Self::Control),
            SoType::None => None,
        }
    }

    /// Map back to the wire `sotype` byte.
    #[must_use]
    pub fn to_sotype(self) -> SoType {
        match self {
            Self::Caller => SoType::Caller,
            Self::Provider => SoType::Provider,
            Self::Monitor => SoType::Monitor,
            Self::Control => SoType::Control,
        }
    }
}

/// Cap on the human-readable connection name sent in SO's meta, in bytes
/// (the wire format has no notion of characters).
pub const MAX_NAME_LEN: usize = 32;

/// Truncate `s` to at most `cap` bytes without splitting a UTF-8 character.
fn truncate_to_byte_cap(s: &str, cap: usize) -> &str {
    if s.len() <= cap {
        return s;
    }
    let mut end = cap;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// A single client connection's state machine, independent of its socket.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    client_type: Option<ClientType>,
    name: Option<String>,
    next_token: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A freshly accepted session, in `Opening` state.
    #[must_use]
    pub fn new() -> Self {
        Self { state: SessionState::Opening, client_type: None, name: None, next_token: 0 }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The client type assigned at handshake, if the handshake completed.
    #[must_use]
    pub fn client_type(&self) -> Option<ClientType> {
        self.client_type
    }

    /// The peer's human name from the SO message, if handshake completed.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Mint the next correlation token for this (caller) session: monotonic,
    /// wrapping at `u32::MAX` while skipping zero.
    pub fn next_token(&mut self) -> u32 {
        self.next_token = if self.next_token == u32::MAX { 1 } else { self.next_token + 1 };
        self.next_token
    }

    /// Process an inbound SO frame. `authorized` is the result of the
    /// optional credential hook, evaluated by the caller against the peer's
    /// credentials before calling this — the session itself never sees
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnexpectedMessage`] if not in `Opening`
    /// state, or [`SessionError::InvalidSoType`] if `sotype` is
    /// `SoType::None`.
    #[allow(clippy::expect_used)]
    pub fn handle_so(
        &mut self,
        sotype: SoType,
        name: Option<&str>,
        authorized: bool,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Opening {
            return Err(SessionError::UnexpectedMessage {
                state: self.state,
                msgtype: MsgType::So as u8,
            });
        }

        let Some(client_type) = ClientType::from_sotype(sotype) else {
            self.state = SessionState::Closed;
            return Err(SessionError::InvalidSoType);
        };

        if !authorized {
            self.state = SessionState::Closed;
            let mut header = MsgHeader::new(MsgType::SoRjct);
            header.set_sotype(sotype);
            let msg = Message::new(header, Vec::new()).expect("empty payload always fits");
            return Ok(vec![SessionAction::Send(msg), SessionAction::Close]);
        }

        self.client_type = Some(client_type);
        self.name = name.map(|n| truncate_to_byte_cap(n, MAX_NAME_LEN).to_owned());
        self.state = SessionState::Open;

        let mut header = MsgHeader::new(MsgType::SoOk);
        header.set_sotype(sotype);
        let msg = Message::new(header, Vec::new()).expect("empty payload always fits");
        Ok(vec![SessionAction::Send(msg)])
    }

    /// This session sent or received a CLOSE message, or its peer hung up;
    /// tear it down. A sudden peer hangup is equivalent to receiving CLOSE
    /// at the router level.
    pub fn close(&mut self) -> Vec<SessionAction> {
        self.state = SessionState::Closed;
        vec![SessionAction::Close]
    }

    /// Build a CLOSE frame to send to the peer, transitioning through
    /// `Closing`. The router closes the socket once it's flushed.
    #[allow(clippy::expect_used)]
    pub fn initiate_close(&mut self) -> Message {
        self.state = SessionState::Closing;
        Message::new(MsgHeader::new(MsgType::Close), Vec::new()).expect("empty payload always fits")
    }

    /// A message type arrived that the current state doesn't handle; close
    /// the session and report it: any unexpected message type closes and
    /// drops the session.
    pub fn reject_unexpected(&mut self, msgtype: MsgType) -> SessionError {
        let state = self.state;
        self.state = SessionState::Closed;
        SessionError::UnexpectedMessage { state, msgtype: msgtype as u8 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_opens_session_with_client_type() {
        let mut session = Session::new();
        let actions = session.handle_so(SoType::Caller, Some("c1"), true).unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.client_type(), Some(ClientType::Caller));
        assert_eq!(session.name(), Some("c1"));
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            SessionAction::Send(msg) => assert_eq!(msg.header().msgtype(), Some(MsgType::SoOk)),
            SessionAction::Close => panic!("expected Send"),
        }
    }

    #[test]
    fn unauthorized_handshake_rejects_and_closes() {
        let mut session = Session::new();
        let actions = session.handle_so(SoType::Caller, Some("c1"), false).unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(actions.len(), 2);
        match &actions[0] {
            SessionAction::Send(msg) => assert_eq!(msg.header().msgtype(), Some(MsgType::SoRjct)),
            SessionAction::Close => panic!("expected Send"),
        }
        assert_eq!(actions[1], SessionAction::Close);
    }

    #[test]
    fn handshake_rejects_none_sotype() {
        let mut session = Session::new();
        let result = session.handle_so(SoType::None, None, true);
        assert!(matches!(result, Err(SessionError::InvalidSoType)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn handshake_twice_is_unexpected() {
        let mut session = Session::new();
        session.handle_so(SoType::Provider, Some("p1"), true).unwrap();
        let result = session.handle_so(SoType::Provider, Some("p1"), true);
        assert!(matches!(result, Err(SessionError::UnexpectedMessage { .. })));
    }

    #[test]
    fn name_is_truncated_to_max_len() {
        let mut session = Session::new();
        let long_name = "x".repeat(MAX_NAME_LEN + 10);
        session.handle_so(SoType::Monitor, Some(&long_name), true).unwrap();
        assert_eq!(session.name().unwrap().len(), MAX_NAME_LEN);
    }

    #[test]
    fn name_truncation_stays_on_a_char_boundary() {
        let mut session = Session::new();
        // Each '\u{1F600}' is 4 bytes; 9 of them is 36 bytes, past the cap,
        // and 32 is not itself a char boundary within this string.
        let long_name = "\u{1F600}".repeat(9);
        session.handle_so(SoType::Monitor, Some(&long_name), true).unwrap();
        let name = session.name().unwrap();
        assert!(name.len() <= MAX_NAME_LEN);
        assert!(std::str::from_utf8(name.as_bytes()).is_ok());
    }

    #[test]
    fn token_assignment_is_monotonic_and_skips_zero() {
        let mut session = Session::new();
        assert_eq!(session.next_token(), 1);
        assert_eq!(session.next_token(), 2);
        assert_eq!(session.next_token(), 3);
    }

    #[test]
    fn token_wraps_skipping_zero() {
        let mut session = Session::new();
        session.handle_so(SoType::Caller, Some("c1"), true).unwrap();
        session.next_token = u32::MAX - 1;
        assert_eq!(session.next_token(), u32::MAX);
        assert_eq!(session.next_token(), 1);
    }

    #[test]
    fn close_transitions_to_closed() {
        let mut session = Session::new();
        session.handle_so(SoType::Caller, Some("c1"), true).unwrap();
        let actions = session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(actions, vec![SessionAction::Close]);
    }
}
