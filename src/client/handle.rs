// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A value-like reference to one remote object.
//!
//! Handles pair an opaque peer-assigned identity with the broker; cloning is
//! cheap and exchanges nothing with the peer. Every stub operation follows
//! the same shape: [`RemoteHandle::request`] prepares a pooled buffer with
//! the request header, the caller appends arguments, and
//! [`RemoteHandle::invoke`] sends it and demultiplexes the reply status into
//! a readable result, a [`UserError`], or a [`SystemError`].

use std::{
    fmt,
    ops::{Deref, DerefMut},
    rc::Rc,
};

use anyhow::Result;
use tracing::debug;

use crate::{
    cdr::buffer::CdrBuffer,
    client::orb::Orb,
    errors::{ProtocolError, SystemError, UserError},
    models::{
        message::MessageHeader, message_type::MessageType, reply::ReplyStatus,
        request::RequestHeader,
    },
};

#[derive(Clone)]
pub struct RemoteHandle {
    orb: Rc<Orb>,
    identity: String,
}

impl RemoteHandle {
    pub fn new(orb: Rc<Orb>, identity: impl Into<String>) -> Self {
        Self {
            orb,
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn orb(&self) -> &Rc<Orb> {
        &self.orb
    }

    /// A sibling handle over the same broker.
    pub fn object(&self, identity: impl Into<String>) -> RemoteHandle {
        RemoteHandle::new(Rc::clone(&self.orb), identity)
    }

    /// Reads an object reference out of a reply and binds it to this broker.
    /// The empty identity decodes as `None`.
    pub fn read_object(&self, buf: &mut CdrBuffer) -> Result<Option<RemoteHandle>> {
        Ok(buf.read_object()?.map(|id| self.object(id)))
    }

    /// Prepares a request buffer for `operation`: pooled, cleared, header
    /// space reserved, RequestHeader written with a fresh id. The returned
    /// buffer is positioned for the caller to append arguments.
    pub fn request(&self, operation: &str) -> Result<CdrBuffer> {
        let mut buf = self.orb.acquire_buffer();
        buf.clear();
        match buf.set_position(MessageHeader::SIZE) {
            Ok(()) => {
                let header = RequestHeader::new(
                    self.orb.next_request_id(),
                    &self.identity,
                    operation,
                );
                debug!(
                    request_id = header.request_id,
                    target = %self.identity,
                    operation,
                    "request prepared"
                );
                header.write_to(&mut buf);
                Ok(buf)
            },
            Err(e) => {
                self.orb.release_buffer(buf);
                Err(e.into())
            },
        }
    }

    /// Sends the prepared request and waits for its reply, servicing any
    /// inbound work that arrives meanwhile. Both the request buffer and
    /// (through the returned guard) the reply buffer go back to the pool on
    /// every path.
    pub fn invoke(&self, buf: CdrBuffer) -> Result<ReplyBuffer> {
        let request_id = match buf.peek_u32(MessageHeader::SIZE) {
            Ok(id) => id,
            Err(e) => {
                self.orb.release_buffer(buf);
                return Err(e.into());
            },
        };

        self.orb.register_waiter(request_id);
        if let Err(e) = self.orb.send_message(buf, MessageType::Request) {
            self.orb.remove_waiter(request_id);
            return Err(e);
        }

        let (reply, header) = self.orb.wait_for_reply(request_id)?;
        let mut reply = ReplyBuffer::new(Rc::clone(&self.orb), reply);

        let status = header
            .reply_status()
            .map_err(|e| ProtocolError(e.to_string()))?;
        match status {
            ReplyStatus::NoException => Ok(reply),
            ReplyStatus::UserException => {
                let exception_type = reply.read_string()?;
                let reason = if reply.remaining() > 0 {
                    reply.read_string()?
                } else {
                    String::new()
                };
                Err(UserError {
                    exception_type,
                    reason,
                }
                .into())
            },
            ReplyStatus::SystemException => {
                let type_id = reply.read_string()?;
                let message = if reply.remaining() > 0 {
                    reply.read_string()?
                } else {
                    String::new()
                };
                Err(SystemError::from_wire(type_id, message).into())
            },
        }
    }

    /// Sends the prepared request as ONEWAY; no reply will ever arrive.
    pub fn invoke_oneway(&self, buf: CdrBuffer) -> Result<()> {
        self.orb.send_message(buf, MessageType::Oneway)
    }
}

impl fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Scope guard around a pooled reply buffer: readable in place, returned to
/// the pool on drop, so early returns in stub code cannot leak it.
pub struct ReplyBuffer {
    orb: Rc<Orb>,
    buf: Option<CdrBuffer>,
}

impl ReplyBuffer {
    fn new(orb: Rc<Orb>, buf: CdrBuffer) -> Self {
        Self {
            orb,
            buf: Some(buf),
        }
    }
}

impl Deref for ReplyBuffer {
    type Target = CdrBuffer;

    fn deref(&self) -> &CdrBuffer {
        self.buf.as_ref().expect("reply buffer present until drop")
    }
}

impl DerefMut for ReplyBuffer {
    fn deref_mut(&mut self) -> &mut CdrBuffer {
        self.buf.as_mut().expect("reply buffer present until drop")
    }
}

impl Drop for ReplyBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.orb.release_buffer(buf);
        }
    }
}

impl fmt::Debug for ReplyBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyBuffer").field("buf", &self.buf).finish()
    }
}
