// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The fixed 12-byte header opening every WRMI frame.
//!
//! ```text
//! offset 0: eye_catcher     u32   0x57524D49 ("WRMI")
//! offset 4: protocol_major  u8    2
//! offset 5: protocol_minor  u8    1
//! offset 6: message_type    u8    REQUEST/REPLY/ONEWAY/SHUTDOWN/VALIDATE
//! offset 7: flags           u8    reserved, echoed back unchanged
//! offset 8: message_length  u32   bytes following the header
//! ```

use crate::{
    cdr::buffer::{CdrBuffer, CdrError},
    errors::ProtocolError,
    models::{
        common::{EYE_CATCHER, PROTOCOL_MAJOR, PROTOCOL_MINOR},
        message_type::MessageType,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub eye_catcher: u32,
    pub protocol_major: u8,
    pub protocol_minor: u8,
    /// Raw byte as sent/received; see [`MessageHeader::message_type`].
    pub message_type: u8,
    /// Reserved. Kept verbatim and mirrored into reply frames.
    pub flags: u8,
    /// Count of bytes *after* this header.
    pub message_length: u32,
}

impl MessageHeader {
    /// Serialized size on the wire.
    pub const SIZE: usize = 12;

    /// A well-formed outbound header for the current protocol version.
    pub fn new(message_type: MessageType, message_length: u32) -> Self {
        Self {
            eye_catcher: EYE_CATCHER,
            protocol_major: PROTOCOL_MAJOR,
            protocol_minor: PROTOCOL_MINOR,
            message_type: message_type.into(),
            flags: 0,
            message_length,
        }
    }

    pub fn write_to(&self, buf: &mut CdrBuffer) {
        buf.write_u32(self.eye_catcher);
        buf.write_u8(self.protocol_major);
        buf.write_u8(self.protocol_minor);
        buf.write_u8(self.message_type);
        buf.write_u8(self.flags);
        buf.write_u32(self.message_length);
    }

    pub fn read_from(buf: &mut CdrBuffer) -> Result<Self, CdrError> {
        Ok(Self {
            eye_catcher: buf.read_u32()?,
            protocol_major: buf.read_u8()?,
            protocol_minor: buf.read_u8()?,
            message_type: buf.read_u8()?,
            flags: buf.read_u8()?,
            message_length: buf.read_u32()?,
        })
    }

    /// Checks the frame sentinel and major version. Either mismatch is fatal
    /// for the session.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.eye_catcher != EYE_CATCHER {
            return Err(ProtocolError(format!(
                "bad eye catcher: 0x{:08x}",
                self.eye_catcher
            )));
        }
        if self.protocol_major != PROTOCOL_MAJOR {
            return Err(ProtocolError(format!(
                "unsupported protocol major version: {}",
                self.protocol_major
            )));
        }
        Ok(())
    }

    /// Typed view of the raw message-type byte.
    pub fn message_type(&self) -> Result<MessageType, ProtocolError> {
        MessageType::try_from(self.message_type)
            .map_err(|e| ProtocolError(e.to_string()))
    }
}
