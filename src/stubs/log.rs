// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::client::handle::RemoteHandle;

/// One line of compiler log output.
///
/// `line_type` classifies the line (note, warning, error, source echo) and
/// `carriage_control` carries the compiler's page-formatting hint; both are
/// passed through as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub line_type: u8,
    pub carriage_control: u8,
    pub text: String,
}

/// Stub over the session log file.
#[derive(Debug, Clone)]
pub struct LogFile {
    handle: RemoteHandle,
}

impl LogFile {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    pub fn get_line_count(&self) -> Result<i64> {
        let buf = self.handle.request("getLineCount")?;
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_i64()?)
    }

    /// Fetches up to `max_lines` lines starting at `first` (zero-based).
    /// Returns the compiler's result code alongside the decoded lines.
    pub fn get_lines(&self, first: i64, max_lines: i32) -> Result<(i32, Vec<LogLine>)> {
        let mut buf = self.handle.request("getLines")?;
        buf.write_i64(first);
        buf.write_i32(max_lines);
        let mut reply = self.handle.invoke(buf)?;

        let result = reply.read_i32()?;
        let count = reply.read_i32()?;
        let mut lines = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            lines.push(LogLine {
                line_type: reply.read_u8()?,
                carriage_control: reply.read_u8()?,
                text: reply.read_string()?,
            });
        }
        Ok((result, lines))
    }
}
