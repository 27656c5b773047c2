// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Common Data Representation buffer: the byte-level codec every WRMI frame
//! goes through.
//!
//! A `CdrBuffer` is a contiguous byte region governed by two cursors:
//!
//! ```text
//! 0 ≤ position ≤ limit ≤ capacity
//! ```
//!
//! In **write mode** (after [`CdrBuffer::clear`]) data is appended at
//! `position`; writing past `limit` grows the allocation by doubling.
//! [`CdrBuffer::flip`] switches to **read mode**: `limit` drops to the old
//! `position` and `position` rewinds to zero, so reads consume exactly what
//! was written. No alignment padding is ever inserted; values occupy their
//! natural width only.
//!
//! Strings are encoded as an `i32` byte count of the UTF-8 payload followed
//! by that many bytes, with no terminating NUL and no padding. The empty
//! string is four zero bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte order used for every multi-byte primitive in one deployment.
///
/// The peer is compiled with the same fixed order; nothing is negotiated on
/// the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Cursor and decode failures. These indicate a caller bug, not a peer
/// protocol violation, and propagate immediately.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CdrError {
    #[error("buffer underflow: requested {requested} bytes, {remaining} remaining")]
    Underflow { requested: usize, remaining: usize },
    #[error("position {position} exceeds limit {limit}")]
    BadPosition { position: usize, limit: usize },
    #[error("limit {limit} exceeds capacity {capacity}")]
    BadLimit { limit: usize, capacity: usize },
    #[error("string length is negative: {0}")]
    NegativeLength(i32),
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Clone)]
pub struct CdrBuffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
    order: ByteOrder,
}

impl CdrBuffer {
    /// Creates a big-endian buffer in write mode over `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::with_order(capacity, ByteOrder::Big)
    }

    pub fn with_order(capacity: usize, order: ByteOrder) -> Self {
        Self {
            data: vec![0; capacity],
            position: 0,
            limit: capacity,
            order,
        }
    }

    #[inline]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes left between `position` and `limit`.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn set_position(&mut self, position: usize) -> Result<(), CdrError> {
        if position > self.limit {
            return Err(CdrError::BadPosition {
                position,
                limit: self.limit,
            });
        }
        self.position = position;
        Ok(())
    }

    /// Moves `limit`. `position` is clamped down when it would end up past
    /// the new limit.
    pub fn set_limit(&mut self, limit: usize) -> Result<(), CdrError> {
        if limit > self.data.len() {
            return Err(CdrError::BadLimit {
                limit,
                capacity: self.data.len(),
            });
        }
        self.limit = limit;
        if self.position > limit {
            self.position = limit;
        }
        Ok(())
    }

    /// Resets to write mode over the full capacity. Contents are left as-is.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    /// Switches to read mode: `limit` becomes the current `position`,
    /// `position` rewinds to zero.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Guarantees capacity for `additional` bytes past `position` without
    /// touching `limit`. Growth doubles the allocation until it fits.
    pub fn reserve(&mut self, additional: usize) {
        let target = self.position + additional;
        if target <= self.data.len() {
            return;
        }
        self.grow_to(target);
    }

    /// Active slice `[position..limit)`.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// Mutable active slice, for transports filling the buffer directly.
    pub fn writable(&mut self) -> &mut [u8] {
        &mut self.data[self.position..self.limit]
    }

    /// Advances `position` by `n` already-consumed or already-filled bytes.
    pub fn advance(&mut self, n: usize) -> Result<(), CdrError> {
        if n > self.remaining() {
            return Err(CdrError::BadPosition {
                position: self.position + n,
                limit: self.limit,
            });
        }
        self.position += n;
        Ok(())
    }

    /// Reads a `u32` at an absolute byte offset, ignoring both cursors.
    /// Used to recover the request id from an already-written header.
    pub fn peek_u32(&self, offset: usize) -> Result<u32, CdrError> {
        if offset + 4 > self.data.len() {
            return Err(CdrError::Underflow {
                requested: 4,
                remaining: self.data.len().saturating_sub(offset),
            });
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.data[offset..offset + 4]);
        Ok(match self.order {
            ByteOrder::Big => u32::from_be_bytes(raw),
            ByteOrder::Little => u32::from_le_bytes(raw),
        })
    }

    // ── write primitives ────────────────────────────────────────────────

    pub fn write_bool(&mut self, v: bool) {
        self.put(&[u8::from(v)]);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    pub fn write_i16(&mut self, v: i16) {
        match self.order {
            ByteOrder::Big => self.put(&v.to_be_bytes()),
            ByteOrder::Little => self.put(&v.to_le_bytes()),
        }
    }

    pub fn write_i32(&mut self, v: i32) {
        match self.order {
            ByteOrder::Big => self.put(&v.to_be_bytes()),
            ByteOrder::Little => self.put(&v.to_le_bytes()),
        }
    }

    pub fn write_u32(&mut self, v: u32) {
        match self.order {
            ByteOrder::Big => self.put(&v.to_be_bytes()),
            ByteOrder::Little => self.put(&v.to_le_bytes()),
        }
    }

    pub fn write_i64(&mut self, v: i64) {
        match self.order {
            ByteOrder::Big => self.put(&v.to_be_bytes()),
            ByteOrder::Little => self.put(&v.to_le_bytes()),
        }
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    pub fn write_f64(&mut self, v: f64) {
        let bits = v.to_bits();
        match self.order {
            ByteOrder::Big => self.put(&bits.to_be_bytes()),
            ByteOrder::Little => self.put(&bits.to_le_bytes()),
        }
    }

    /// `i32` byte count, then the UTF-8 bytes. Empty strings emit the count
    /// only.
    pub fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        self.write_i32(bytes.len() as i32);
        self.put(bytes);
    }

    /// Writes an object reference as its identity string; `None` encodes as
    /// the empty string.
    pub fn write_object(&mut self, identity: Option<&str>) {
        self.write_string(identity.unwrap_or(""));
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    // ── read primitives ─────────────────────────────────────────────────

    pub fn read_bool(&mut self) -> Result<bool, CdrError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8, CdrError> {
        let b = self.take(1)?;
        Ok(b[0])
    }

    pub fn read_i16(&mut self) -> Result<i16, CdrError> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.take(2)?);
        Ok(match self.order {
            ByteOrder::Big => i16::from_be_bytes(raw),
            ByteOrder::Little => i16::from_le_bytes(raw),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, CdrError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(match self.order {
            ByteOrder::Big => i32::from_be_bytes(raw),
            ByteOrder::Little => i32::from_le_bytes(raw),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, CdrError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(match self.order {
            ByteOrder::Big => u32::from_be_bytes(raw),
            ByteOrder::Little => u32::from_le_bytes(raw),
        })
    }

    pub fn read_i64(&mut self) -> Result<i64, CdrError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(match self.order {
            ByteOrder::Big => i64::from_be_bytes(raw),
            ByteOrder::Little => i64::from_le_bytes(raw),
        })
    }

    pub fn read_f32(&mut self) -> Result<f32, CdrError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, CdrError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        let bits = match self.order {
            ByteOrder::Big => u64::from_be_bytes(raw),
            ByteOrder::Little => u64::from_le_bytes(raw),
        };
        Ok(f64::from_bits(bits))
    }

    /// Symmetric to [`CdrBuffer::write_string`]. On any failure `position`
    /// is restored to where the read started.
    pub fn read_string(&mut self) -> Result<String, CdrError> {
        let start = self.position;
        let len = self.read_i32()?;
        if len < 0 {
            self.position = start;
            return Err(CdrError::NegativeLength(len));
        }
        let n = len as usize;
        if self.remaining() < n {
            let remaining = self.remaining();
            self.position = start;
            return Err(CdrError::Underflow {
                requested: n,
                remaining,
            });
        }
        let bytes = self.data[self.position..self.position + n].to_vec();
        match String::from_utf8(bytes) {
            Ok(s) => {
                self.position += n;
                Ok(s)
            },
            Err(_) => {
                self.position = start;
                Err(CdrError::InvalidUtf8)
            },
        }
    }

    /// Reads an object reference; the empty identity decodes as `None`.
    pub fn read_object(&mut self) -> Result<Option<String>, CdrError> {
        let identity = self.read_string()?;
        if identity.is_empty() {
            Ok(None)
        } else {
            Ok(Some(identity))
        }
    }

    // ── internals ───────────────────────────────────────────────────────

    fn put(&mut self, bytes: &[u8]) {
        self.ensure_writable(bytes.len());
        self.data[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
    }

    fn take(&mut self, n: usize) -> Result<&[u8], CdrError> {
        if self.remaining() < n {
            return Err(CdrError::Underflow {
                requested: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    /// Growth policy: smallest doubling of the current capacity that fits
    /// `capacity + needed`. Any slice previously taken out of the buffer is
    /// invalidated by growth.
    fn ensure_writable(&mut self, needed: usize) {
        if self.remaining() >= needed {
            return;
        }
        self.grow_to(self.data.len() + needed);
        self.limit = self.data.len();
    }

    fn grow_to(&mut self, target: usize) {
        let mut new_cap = self.data.len().max(1);
        while new_cap < target {
            new_cap *= 2;
        }
        self.data.resize(new_cap, 0);
    }
}

impl fmt::Debug for CdrBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdrBuffer")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.data.len())
            .field("order", &self.order)
            .finish()
    }
}
