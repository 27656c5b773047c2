// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Pool of reusable CDR buffers.
//!
//! Buffers are single-owner values moved out on acquire and back in on
//! release. The pool grows on demand and never shrinks; contents are not
//! reset here, callers `clear` at acquisition time. The outstanding count
//! is the canonical leak detector in tests.

use tracing::debug;

use crate::cdr::buffer::{ByteOrder, CdrBuffer};

#[derive(Debug)]
pub struct BufferPool {
    idle: Vec<CdrBuffer>,
    outstanding: usize,
    default_capacity: usize,
    order: ByteOrder,
}

impl BufferPool {
    pub fn new(default_capacity: usize, order: ByteOrder) -> Self {
        Self {
            idle: Vec::new(),
            outstanding: 0,
            default_capacity,
            order,
        }
    }

    /// Pops an idle buffer, or allocates a fresh one at the default
    /// capacity.
    pub fn acquire(&mut self) -> CdrBuffer {
        self.outstanding += 1;
        match self.idle.pop() {
            Some(buf) => buf,
            None => {
                debug!(
                    capacity = self.default_capacity,
                    outstanding = self.outstanding,
                    "pool grows by one buffer"
                );
                CdrBuffer::with_order(self.default_capacity, self.order)
            },
        }
    }

    pub fn release(&mut self, buf: CdrBuffer) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.idle.push(buf);
    }

    /// Buffers currently out of the pool. Zero after every complete
    /// operation.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }
}
