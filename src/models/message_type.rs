// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The message-type byte carried in every MessageHeader.
//!
//! The header keeps the byte exactly as received; conversion to the typed
//! enum happens at dispatch time so unknown values can be rejected as a
//! protocol violation instead of being silently remapped.

use std::convert::TryFrom;

use thiserror::Error;

/// All frame kinds defined by WRMI 2.1.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    #[default]
    Request = 1,
    Reply = 2,
    Oneway = 3,
    Shutdown = 4,
    Validate = 5,
}

/// Returned when the header carries an undefined message type.
#[derive(Debug, Error)]
#[error("unknown message type: 0x{0:02x}")]
pub struct UnknownMessageType(pub u8);

impl TryFrom<u8> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            1 => Self::Request,
            2 => Self::Reply,
            3 => Self::Oneway,
            4 => Self::Shutdown,
            5 => Self::Validate,
            other => return Err(UnknownMessageType(other)),
        })
    }
}

impl From<MessageType> for u8 {
    fn from(ty: MessageType) -> u8 {
        ty as u8
    }
}
