// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Variable-length header following the MessageHeader of every REQUEST and
//! ONEWAY frame. Operation arguments start immediately after it.

use crate::cdr::buffer::{CdrBuffer, CdrError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeader {
    /// Matches the reply back to its waiter. Fresh per request, wrapping.
    pub request_id: u32,
    /// Identity of the remote object the operation targets.
    pub target_object: String,
    /// Reserved for future routing; written even when empty.
    pub future: String,
    /// Operation name, e.g. `createSession`.
    pub operation: String,
    /// Reserved. Always 0 on outbound requests.
    pub flags: u8,
}

impl RequestHeader {
    pub fn new(request_id: u32, target_object: &str, operation: &str) -> Self {
        Self {
            request_id,
            target_object: target_object.to_string(),
            future: String::new(),
            operation: operation.to_string(),
            flags: 0,
        }
    }

    pub fn write_to(&self, buf: &mut CdrBuffer) {
        buf.write_u32(self.request_id);
        buf.write_string(&self.target_object);
        buf.write_string(&self.future);
        buf.write_string(&self.operation);
        buf.write_u8(self.flags);
    }

    pub fn read_from(buf: &mut CdrBuffer) -> Result<Self, CdrError> {
        Ok(Self {
            request_id: buf.read_u32()?,
            target_object: buf.read_string()?,
            future: buf.read_string()?,
            operation: buf.read_string()?,
            flags: buf.read_u8()?,
        })
    }
}
