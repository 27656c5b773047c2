// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::client::handle::RemoteHandle;

/// Stub over an open dataset. Exposes metadata only; bulk data moves
/// through the compiler's own import/export commands, not this protocol.
#[derive(Debug, Clone)]
pub struct Dataset {
    handle: RemoteHandle,
}

impl Dataset {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    pub fn close(&self) -> Result<()> {
        let buf = self.handle.request("close")?;
        let _reply = self.handle.invoke(buf)?;
        Ok(())
    }

    /// Number of observations.
    pub fn get_nobs(&self) -> Result<i64> {
        let buf = self.handle.request("getNobs")?;
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_i64()?)
    }

    /// Number of variables.
    pub fn get_nvars(&self) -> Result<i32> {
        let buf = self.handle.request("getNvars")?;
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_i32()?)
    }
}
