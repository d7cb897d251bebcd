//! The 12-byte frame header.
//!
//! ```text
//! offset  size  field
//! 0       2     magic    (network order, 0xBBC5)
//! 2       1     msgtype
//! 3       1     sotype
//! 4       1     errcode
//! 5       4     token    (network order)
//! 9       2     psize    (network order)
//! 11      1     flags
//! ```
//!
//! This is laid out by hand rather than derived with a packed-struct crate:
//! the field widths don't land on natural alignment boundaries (a u32 at
//! offset 5, a u16 at offset 9), so there is no `repr(C)` shape that matches
//! the wire layout without padding.

use crate::error::{ProtocolError, Result};

/// `SO=1, SOOK=2, SORJCT=3, SRVREG=4, SRVUNREG=5, SRVACK=6, CLICALL=7,
/// CLIREPLY=8, CLISIG=9, SRVCALL=10, SRVREPLY=11, SRVSIG=12, CLOSE=13,
/// CTRL=14, MON=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MsgType {
    /// Session-open request.
    So = 1,
    /// Session-open accepted.
    SoOk = 2,
    /// Session-open rejected.
    SoRjct = 3,
    /// Provider publishes a method.
    SrvReg = 4,
    /// Provider withdraws a method.
    SrvUnreg = 5,
    /// Daemon's reply to SRVREG/SRVUNREG.
    SrvAck = 6,
    /// Caller invokes a method.
    CliCall = 7,
    /// Daemon replies to a caller.
    CliReply = 8,
    /// Reserved: caller signal (not routed).
    CliSig = 9,
    /// Daemon forwards a call to a provider.
    SrvCall = 10,
    /// Provider replies to a forwarded call.
    SrvReply = 11,
    /// Reserved: provider signal (not routed).
    SrvSig = 12,
    /// Graceful session close.
    Close = 13,
    /// Control command.
    Ctrl = 14,
    /// Monitor mirror frame.
    Mon = 15,
}

impl MsgType {
    /// Decode a wire byte, if it names a known message type.
    #[must_use]
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::So),
            2 => Some(Self::SoOk),
            3 => Some(Self::SoRjct),
            4 => Some(Self::SrvReg),
            5 => Some(Self::SrvUnreg),
            6 => Some(Self::SrvAck),
            7 => Some(Self::CliCall),
            8 => Some(Self::CliReply),
            9 => Some(Self::CliSig),
            10 => Some(Self::SrvCall),
            11 => Some(Self::SrvReply),
            12 => Some(Self::SrvSig),
            13 => Some(Self::Close),
            14 => Some(Self::Ctrl),
            15 => Some(Self::Mon),
            _ => None,
        }
    }
}

/// Session-open client type: `NONE=0, caller=1, provider=2, monitor=3,
/// control=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SoType {
    /// Not a session-open frame.
    #[default]
    None = 0,
    /// Calls methods.
    Caller = 1,
    /// Publishes methods.
    Provider = 2,
    /// Observes all traffic.
    Monitor = 3,
    /// Issues control commands.
    Control = 4,
}

impl SoType {
    /// Decode a wire byte, if it names a known session-open type.
    #[must_use]
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::None),
            1 => Some(Self::Caller),
            2 => Some(Self::Provider),
            3 => Some(Self::Monitor),
            4 => Some(Self::Control),
            _ => None,
        }
    }
}

/// `GOOD=0, NOMETHOD=1, METHODERR=2, MREGERR=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ErrCode {
    /// No error.
    #[default]
    Good = 0,
    /// No method at the given path.
    NoMethod = 1,
    /// The method itself failed.
    MethodErr = 2,
    /// Registration failed (already registered, bad descriptor, etc.).
    MRegErr = 3,
}

impl ErrCode {
    /// Decode a wire byte, if it names a known error code.
    #[must_use]
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Good),
            1 => Some(Self::NoMethod),
            2 => Some(Self::MethodErr),
            3 => Some(Self::MRegErr),
            _ => None,
        }
    }
}

/// `HAS_META` bit: payload begins with a NUL-terminated meta string.
pub const FLAG_HAS_META: u8 = 0x01;
/// `HAS_OBJECT` bit: payload tail (after any meta) is object bytes.
pub const FLAG_HAS_OBJECT: u8 = 0x02;

/// The fixed 12-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    msgtype: u8,
    sotype: u8,
    errcode: u8,
    token: u32,
    psize: u16,
    flags: u8,
}

impl MsgHeader {
    /// Real, padding-free wire size of the header.
    pub const SIZE: usize = 12;
    /// Fixed magic value every frame must start with.
    pub const MAGIC: u16 = 0xBBC5;

    /// Build a header for `msgtype`. `sotype` is meaningful only on
    /// session-open frames; it defaults to `SoType::None` elsewhere.
    #[must_use]
    pub fn new(msgtype: MsgType) -> Self {
        Self { msgtype: msgtype as u8, sotype: 0, errcode: 0, token: 0, psize: 0, flags: 0 }
    }

    /// Message type, if the byte names one of the wire's 15 values.
    #[must_use]
    pub fn msgtype(&self) -> Option<MsgType> {
        MsgType::from_u8(self.msgtype)
    }

    /// Raw message-type byte, including values outside the known set.
    #[must_use]
    pub fn msgtype_raw(&self) -> u8 {
        self.msgtype
    }

    /// Session-open client type.
    #[must_use]
    pub fn sotype(&self) -> Option<SoType> {
        SoType::from_u8(self.sotype)
    }

    /// Set the session-open client type.
    pub fn set_sotype(&mut self, sotype: SoType) {
        self.sotype = sotype as u8;
    }

    /// Error code carried by a reply.
    #[must_use]
    pub fn errcode(&self) -> Option<ErrCode> {
        ErrCode::from_u8(self.errcode)
    }

    /// Set the error code.
    pub fn set_errcode(&mut self, errcode: ErrCode) {
        self.errcode = errcode as u8;
    }

    /// Correlation token.
    #[must_use]
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Set the correlation token.
    pub fn set_token(&mut self, token: u32) {
        self.token = token;
    }

    /// Declared payload size.
    #[must_use]
    pub fn psize(&self) -> u16 {
        self.psize
    }

    /// Set the payload size, capped at `u16::MAX` (tests `2*UINT16_MAX`
    /// reads back as `UINT16_MAX`).
    pub fn set_psize(&mut self, size: u32) {
        self.psize = u16::try_from(size).unwrap_or(u16::MAX);
    }

    /// Raw flag byte.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Set the raw flag byte.
    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    /// `HAS_META` bit is set.
    #[must_use]
    pub fn has_meta(&self) -> bool {
        self.flags & FLAG_HAS_META != 0
    }

    /// `HAS_OBJECT` bit is set.
    #[must_use]
    pub fn has_object(&self) -> bool {
        self.flags & FLAG_HAS_OBJECT != 0
    }

    /// Serialize to the exact 12-byte wire layout, multi-byte fields in
    /// network order.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&Self::MAGIC.to_be_bytes());
        buf[2] = self.msgtype;
        buf[3] = self.sotype;
        buf[4] = self.errcode;
        buf[5..9].copy_from_slice(&self.token.to_be_bytes());
        buf[9..11].copy_from_slice(&self.psize.to_be_bytes());
        buf[11] = self.flags;
        buf
    }

    /// Parse a header from the first `SIZE` bytes of `bytes`, validating
    /// magic. Trailing bytes are ignored by this call (the payload, if any,
    /// lives past them).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(ProtocolError::HeaderTooShort { need: Self::SIZE, got: bytes.len() });
        }

        let magic = u16::from_be_bytes([bytes[0], bytes[1]]);
        if magic != Self::MAGIC {
            return Err(ProtocolError::BadMagic { expected: Self::MAGIC, got: magic });
        }

        Ok(Self {
            msgtype: bytes[2],
            sotype: bytes[3],
            errcode: bytes[4],
            token: u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
            psize: u16::from_be_bytes([bytes[9], bytes[10]]),
            flags: bytes[11],
        })
    }
}
