// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Fixed 5-byte header following the MessageHeader of every REPLY frame.

use std::convert::TryFrom;

use thiserror::Error;

use crate::cdr::buffer::{CdrBuffer, CdrError};

/// Outcome demultiplexer for a reply: the body after the header is either
/// the operation result, a user exception, or a system exception.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    #[default]
    NoException = 0,
    UserException = 1,
    SystemException = 2,
}

#[derive(Debug, Error)]
#[error("unknown reply status: 0x{0:02x}")]
pub struct UnknownReplyStatus(pub u8);

impl TryFrom<u8> for ReplyStatus {
    type Error = UnknownReplyStatus;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0 => Self::NoException,
            1 => Self::UserException,
            2 => Self::SystemException,
            other => return Err(UnknownReplyStatus(other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHeader {
    pub request_id: u32,
    /// Raw status byte as received; see [`ReplyHeader::reply_status`].
    pub reply_status: u8,
}

impl ReplyHeader {
    pub const SIZE: usize = 5;

    pub fn new(request_id: u32, status: ReplyStatus) -> Self {
        Self {
            request_id,
            reply_status: status as u8,
        }
    }

    pub fn write_to(&self, buf: &mut CdrBuffer) {
        buf.write_u32(self.request_id);
        buf.write_u8(self.reply_status);
    }

    pub fn read_from(buf: &mut CdrBuffer) -> Result<Self, CdrError> {
        Ok(Self {
            request_id: buf.read_u32()?,
            reply_status: buf.read_u8()?,
        })
    }

    pub fn reply_status(&self) -> Result<ReplyStatus, UnknownReplyStatus> {
        ReplyStatus::try_from(self.reply_status)
    }
}
