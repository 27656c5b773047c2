// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};

use crate::{
    client::handle::RemoteHandle,
    stubs::{libref::Libref, listing::ListingFile, log::LogFile},
};

/// Stub for one compiler session.
///
/// A session must be initialized exactly once, via [`Session::init`] for the
/// defaults or [`Session::init_with_options`] to pass `name=value` startup
/// options, before programs are submitted through it.
#[derive(Debug, Clone)]
pub struct Session {
    handle: RemoteHandle,
}

impl Session {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    pub fn init(&self) -> Result<()> {
        let buf = self.handle.request("init")?;
        let _reply = self.handle.invoke(buf)?;
        Ok(())
    }

    /// Initializes with explicit options: a pair count followed by the
    /// name/value strings, in the order given.
    pub fn init_with_options(&self, options: &[(String, String)]) -> Result<()> {
        let mut buf = self.handle.request("initWithOptions")?;
        buf.write_i32(options.len() as i32);
        for (name, value) in options {
            buf.write_string(name);
            buf.write_string(value);
        }
        let _reply = self.handle.invoke(buf)?;
        Ok(())
    }

    /// Submits program text and returns the compiler's return code.
    pub fn submit_text(&self, code: &str) -> Result<i32> {
        let mut buf = self.handle.request("submitText")?;
        buf.write_string(code);
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_i32()?)
    }

    /// Looks up an already-assigned library reference by name.
    pub fn get_libref(&self, name: &str) -> Result<Libref> {
        let mut buf = self.handle.request("getLibref")?;
        buf.write_string(name);
        let mut reply = self.handle.invoke(buf)?;
        let libref = self
            .handle
            .read_object(&mut reply)?
            .with_context(|| format!("libref {name:?} does not exist"))?;
        Ok(Libref::new(libref))
    }

    /// Assigns a new library reference over a directory path and engine.
    pub fn assign_libref(&self, name: &str, path: &str, engine: &str) -> Result<Libref> {
        let mut buf = self.handle.request("assignLibref")?;
        buf.write_string(name);
        buf.write_string(path);
        buf.write_string(engine);
        let mut reply = self.handle.invoke(buf)?;
        let libref = self
            .handle
            .read_object(&mut reply)?
            .with_context(|| format!("assignLibref {name:?} returned a null libref"))?;
        Ok(Libref::new(libref))
    }

    pub fn get_macro_variable(&self, name: &str) -> Result<String> {
        let mut buf = self.handle.request("getMacroVariable")?;
        buf.write_string(name);
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_string()?)
    }

    pub fn set_macro_variable(&self, name: &str, value: &str) -> Result<()> {
        let mut buf = self.handle.request("setMacroVariable")?;
        buf.write_string(name);
        buf.write_string(value);
        let _reply = self.handle.invoke(buf)?;
        Ok(())
    }

    /// Opens the session log as a readable remote file.
    pub fn open_log(&self) -> Result<LogFile> {
        let buf = self.handle.request("openLog")?;
        let mut reply = self.handle.invoke(buf)?;
        let log = self
            .handle
            .read_object(&mut reply)?
            .context("openLog returned a null log file")?;
        Ok(LogFile::new(log))
    }

    /// Opens the listing output as a readable remote file.
    pub fn open_listing(&self) -> Result<ListingFile> {
        let buf = self.handle.request("openListing")?;
        let mut reply = self.handle.invoke(buf)?;
        let listing = self
            .handle
            .read_object(&mut reply)?
            .context("openListing returned a null listing file")?;
        Ok(ListingFile::new(listing))
    }

    /// Discards listing output accumulated so far.
    pub fn clear_listing_file(&self) -> Result<()> {
        let buf = self.handle.request("clearListingFile")?;
        let _reply = self.handle.invoke(buf)?;
        Ok(())
    }
}
