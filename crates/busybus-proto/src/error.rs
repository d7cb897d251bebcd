//! Error taxonomy for wire framing and the typed-object codec.

/// Errors raised while parsing a description string, building or parsing an
/// object against one, or framing/deframing a message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A description string did not match the `item* := 'i'|'u'|'b'|'s'|'A'
    /// item|'(' item+ ')'` grammar.
    #[error("invalid description string: {0}")]
    InvalidDescription(String),

    /// Build was given a different number of values than the description
    /// calls for, or a value's shape didn't match its item.
    #[error("object format error: {0}")]
    ObjectFormat(String),

    /// Header buffer shorter than `MsgHeader::SIZE`.
    #[error("header too short: need {need} bytes, got {got}")]
    HeaderTooShort {
        /// Bytes required.
        need: usize,
        /// Bytes available.
        got: usize,
    },

    /// Magic field did not match `MsgHeader::MAGIC`.
    #[error("bad magic: expected {expected:#06x}, got {got:#06x}")]
    BadMagic {
        /// Expected magic value.
        expected: u16,
        /// Magic value actually read.
        got: u16,
    },

    /// Frame's declared `psize` exceeds the bytes actually present.
    #[error("payload shorter than declared: need {need} bytes, got {got}")]
    PayloadTooShort {
        /// Bytes the header's `psize` promises.
        need: usize,
        /// Bytes available.
        got: usize,
    },

    /// A payload larger than the protocol's maximum was handed to
    /// `Message::new`.
    #[error("payload too large: {size} bytes exceeds max {max}")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },

    /// `extractobj` called on a message without `HAS_OBJECT` set.
    #[error("message has no object payload")]
    NoObject,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
