//! Wire framing and the typed-object codec for the busybus protocol.
//!
//! This crate has no knowledge of sockets, sessions, or routing — it only
//! knows how to turn a [`frame::Message`] into bytes and back, and how to
//! build/parse a typed [`object::Object`] against a description string.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod frame;
pub mod header;
pub mod object;

pub use error::{ProtocolError, Result};
pub use frame::{Message, MAX_PAYLOAD_SIZE};
pub use header::{ErrCode, MsgHeader, MsgType, SoType, FLAG_HAS_META, FLAG_HAS_OBJECT};
pub use object::{descrvalid, parse_descr, Item, Object, Value};
