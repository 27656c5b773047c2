// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::client::handle::RemoteHandle;

/// One page of listing output: the page geometry it was rendered with and
/// its text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub geometry_index: i64,
    pub lines: Vec<String>,
}

/// Stub over the session listing file.
#[derive(Debug, Clone)]
pub struct ListingFile {
    handle: RemoteHandle,
}

impl ListingFile {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    pub fn get_page_count(&self) -> Result<i64> {
        let buf = self.handle.request("getPageCount")?;
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_i64()?)
    }

    /// Fetches one page by number; `None` when the page does not exist.
    pub fn get_page(&self, page_number: i64) -> Result<Option<ListingPage>> {
        let mut buf = self.handle.request("getPage")?;
        buf.write_i64(page_number);
        let mut reply = self.handle.invoke(buf)?;

        if !reply.read_bool()? {
            return Ok(None);
        }
        let geometry_index = reply.read_i64()?;
        let count = reply.read_i32()?;
        let mut lines = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            lines.push(reply.read_string()?);
        }
        Ok(Some(ListingPage {
            geometry_index,
            lines,
        }))
    }
}
