// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};

use crate::{client::handle::RemoteHandle, stubs::dataset::Dataset};

/// One member of a library: its name plus the compiler's type tag
/// (e.g. `DATA`, `VIEW`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub member_type: String,
}

/// Stub for a library reference inside a session.
#[derive(Debug, Clone)]
pub struct Libref {
    handle: RemoteHandle,
}

impl Libref {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    pub fn get_name(&self) -> Result<String> {
        let buf = self.handle.request("getName")?;
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_string()?)
    }

    /// Lists the members as `(name, type)` pairs preceded by their count.
    pub fn get_member_infos(&self) -> Result<Vec<MemberInfo>> {
        let buf = self.handle.request("getMemberInfos")?;
        let mut reply = self.handle.invoke(buf)?;

        let count = reply.read_i32()?;
        let mut members = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            members.push(MemberInfo {
                name: reply.read_string()?,
                member_type: reply.read_string()?,
            });
        }
        Ok(members)
    }

    /// Opens an existing dataset in the given access mode.
    pub fn open_dataset(&self, name: &str, mode: &str) -> Result<Dataset> {
        let mut buf = self.handle.request("openDataset")?;
        buf.write_string(name);
        buf.write_string(mode);
        let mut reply = self.handle.invoke(buf)?;
        let dataset = self
            .handle
            .read_object(&mut reply)?
            .with_context(|| format!("dataset {name:?} does not exist"))?;
        Ok(Dataset::new(dataset))
    }

    pub fn create_dataset(&self, name: &str) -> Result<Dataset> {
        let mut buf = self.handle.request("createDataset")?;
        buf.write_string(name);
        let mut reply = self.handle.invoke(buf)?;
        let dataset = self
            .handle
            .read_object(&mut reply)?
            .with_context(|| format!("createDataset {name:?} returned a null dataset"))?;
        Ok(Dataset::new(dataset))
    }
}
