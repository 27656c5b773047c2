// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Error kinds surfaced by the ORB, distinguishable by type so callers can
//! downcast out of an `anyhow::Error` chain.
//!
//! Transport, protocol and timeout failures are fatal for the broker: the
//! caller is expected to shut it down and reconstruct. User and system
//! exceptions are per-call outcomes decoded from a REPLY frame. Nothing is
//! retried at this layer.

use std::io;

use thiserror::Error;

/// Byte-channel failure: a send/recv error, a premature EOF, or the peer
/// process going away underneath us.
#[derive(Debug, Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    pub message: String,
    #[source]
    pub source: Option<io::Error>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn premature_eof() -> Self {
        Self::new("premature EOF")
    }

    /// The liveness probe saw the child exit; whatever stderr it produced is
    /// folded into the message.
    pub fn peer_died(stderr: &str) -> Self {
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Self::new("peer died")
        } else {
            Self::new(format!("peer died: {stderr}"))
        }
    }
}

/// The peer broke framing: wrong eye-catcher, unsupported major version,
/// unknown message type or reply status.
#[derive(Debug, Error)]
#[error("protocol violation: {0}")]
pub struct ProtocolError(pub String);

/// The wait-for-reply loop exhausted its configured attempt bound.
#[derive(Debug, Error)]
#[error("no reply after {attempts} receive attempts")]
pub struct TimeoutError {
    pub attempts: u32,
}

/// Application-level exception raised by the peer (REPLY status 1).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{exception_type}: {reason}")]
pub struct UserError {
    pub exception_type: String,
    pub reason: String,
}

/// System-level exception: raised locally by the object adapter or decoded
/// from a REPLY with status 2. The wire form is the type-id string followed
/// by an optional message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemError {
    #[error("object already registered: {0}")]
    AlreadyRegistered(String),
    #[error("object does not exist: {0}")]
    ObjectNotExist(String),
    #[error("bad operation: {0}")]
    BadOperation(String),
    #[error("servant not active: {0}")]
    ServantNotActive(String),
    #[error("{type_id}: {message}")]
    Unknown { type_id: String, message: String },
}

impl SystemError {
    /// Stable identifier written on the wire for this kind.
    pub fn type_id(&self) -> &str {
        match self {
            Self::AlreadyRegistered(_) => "AlreadyRegisteredError",
            Self::ObjectNotExist(_) => "ObjectNotExistError",
            Self::BadOperation(_) => "BadOperationError",
            Self::ServantNotActive(_) => "ServantNotActiveError",
            Self::Unknown { type_id, .. } => type_id,
        }
    }

    /// Free-form detail accompanying the type-id.
    pub fn message(&self) -> &str {
        match self {
            Self::AlreadyRegistered(m)
            | Self::ObjectNotExist(m)
            | Self::BadOperation(m)
            | Self::ServantNotActive(m) => m,
            Self::Unknown { message, .. } => message,
        }
    }

    /// Rebuilds the typed kind from its wire form. Unrecognized type-ids are
    /// preserved verbatim as `Unknown`.
    pub fn from_wire(type_id: String, message: String) -> Self {
        match type_id.as_str() {
            "AlreadyRegisteredError" => Self::AlreadyRegistered(message),
            "ObjectNotExistError" => Self::ObjectNotExist(message),
            "BadOperationError" => Self::BadOperation(message),
            "ServantNotActiveError" => Self::ServantNotActive(message),
            _ => Self::Unknown { type_id, message },
        }
    }
}
