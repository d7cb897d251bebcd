//! A complete message: header plus payload.
//!
//! The payload is the concatenation of an optional NUL-terminated meta
//! string (when `HAS_META` is set) and an optional object buffer (when
//! `HAS_OBJECT` is set). Either, both, or neither may be present.

use crate::error::{ProtocolError, Result};
use crate::header::{MsgHeader, FLAG_HAS_META, FLAG_HAS_OBJECT};
use crate::object::Object;

/// Largest payload a message may carry. Distinct from the header's own
/// `psize` wire cap (`u16::MAX`): this is the protocol-level limit from the
/// data model, enforced here rather than relying on the wire field alone.
pub const MAX_PAYLOAD_SIZE: usize = 4096;

/// A header paired with its payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: MsgHeader,
    payload: Vec<u8>,
}

impl Message {
    /// Pair a header with a payload, setting the header's `psize` to match
    /// and rejecting payloads over [`MAX_PAYLOAD_SIZE`].
    pub fn new(mut header: MsgHeader, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge { size: payload.len(), max: MAX_PAYLOAD_SIZE });
        }
        header.set_psize(payload.len() as u32);
        Ok(Self { header, payload })
    }

    /// The header.
    #[must_use]
    pub fn header(&self) -> &MsgHeader {
        &self.header
    }

    /// The raw payload bytes (meta and/or object, concatenated).
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialize header and payload back to back.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MsgHeader::SIZE + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse a header followed by exactly `psize` bytes of payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = MsgHeader::from_bytes(bytes)?;
        let psize = usize::from(header.psize());
        let available = bytes.len() - MsgHeader::SIZE;
        if available < psize {
            return Err(ProtocolError::PayloadTooShort { need: psize, got: available });
        }
        let payload = bytes[MsgHeader::SIZE..MsgHeader::SIZE + psize].to_vec();
        Ok(Self { header, payload })
    }

    /// Byte offset within the payload where the object region (if any)
    /// begins: zero if there's no meta string, or just past the meta's NUL
    /// terminator.
    fn object_offset(&self) -> usize {
        if !self.header.has_meta() {
            return 0;
        }
        match self.payload.iter().position(|&b| b == 0) {
            Some(nul) => nul + 1,
            None => self.payload.len(),
        }
    }

    /// The meta string, if `HAS_META` is set and a NUL terminator is
    /// present in the payload. Returns `None` in both the unset-flag and
    /// malformed-payload cases, matching the underlying C accessor's
    /// "returns null" contract rather than surfacing an error.
    #[must_use]
    pub fn extractmeta(&self) -> Option<&str> {
        if !self.header.has_meta() {
            return None;
        }
        let nul = self.payload.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&self.payload[..nul]).ok()
    }

    /// The object region of the payload, if `HAS_OBJECT` is set.
    pub fn extractobj(&self) -> Result<Object> {
        if !self.header.has_object() {
            return Err(ProtocolError::NoObject);
        }
        let start = self.object_offset();
        Ok(Object::frombuf(&self.payload[start.min(self.payload.len())..]))
    }

    /// Build a payload from an optional meta string and an optional object,
    /// setting `HAS_META`/`HAS_OBJECT` to match what was supplied.
    pub fn build_payload(meta: Option<&str>, object: Option<&Object>) -> (Vec<u8>, u8) {
        let mut payload = Vec::new();
        let mut flags = 0u8;
        if let Some(meta) = meta {
            payload.extend_from_slice(meta.as_bytes());
            payload.push(0);
            flags |= FLAG_HAS_META;
        }
        if let Some(object) = object {
            payload.extend_from_slice(object.rawdata());
            flags |= FLAG_HAS_OBJECT;
        }
        (payload, flags)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::header::MsgType;
    use crate::object::Value;

    fn build_message(meta: Option<&str>, object: Option<&Object>) -> Message {
        let (payload, flags) = Message::build_payload(meta, object);
        let mut header = MsgHeader::new(MsgType::CliCall);
        header.set_flags(flags);
        Message::new(header, payload).unwrap()
    }

    #[test]
    fn extractmeta_none_when_flag_unset() {
        let msg = build_message(None, None);
        assert_eq!(msg.extractmeta(), None);
    }

    #[test]
    fn extractmeta_some_when_present() {
        let msg = build_message(Some("bbus.echo.echo"), None);
        assert_eq!(msg.extractmeta(), Some("bbus.echo.echo"));
    }

    #[test]
    fn extractobj_errors_when_flag_unset() {
        let msg = build_message(Some("meta"), None);
        assert!(matches!(msg.extractobj(), Err(ProtocolError::NoObject)));
    }

    #[test]
    fn extractobj_reads_past_meta() {
        let object = Object::build("i", &[Value::I(42)]).unwrap();
        let msg = build_message(Some("bbus.echo.echo"), Some(&object));
        let mut parsed = msg.extractobj().unwrap();
        assert_eq!(parsed.parse("i").unwrap(), vec![Value::I(42)]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let object = Object::build("s", &[Value::S(b"hi".to_vec())]).unwrap();
        let msg = build_message(Some("bbus.echo.echo"), Some(&object));
        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let msg = build_message(Some("meta"), None);
        let mut bytes = msg.encode();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(Message::decode(&bytes), Err(ProtocolError::PayloadTooShort { .. })));
    }

    #[test]
    fn new_rejects_oversized_payload() {
        let header = MsgHeader::new(MsgType::CliCall);
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            Message::new(header, payload),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    proptest! {
        #[test]
        fn meta_only_round_trip(meta in "[a-z.]{1,32}") {
            let msg = build_message(Some(&meta), None);
            let bytes = msg.encode();
            let decoded = Message::decode(&bytes).unwrap();
            prop_assert_eq!(decoded.extractmeta(), Some(meta.as_str()));
        }
    }
}
