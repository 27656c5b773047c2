// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::rc::Rc;

use anyhow::{Context, Result};

use crate::{
    client::{handle::RemoteHandle, orb::Orb},
    models::common::ROOT_SERVER_IDENTITY,
    stubs::session::Session,
};

/// Stub for the root compiler server object.
///
/// This is the bootstrap object: its identity is fixed (`"wpsserver"`) rather
/// than assigned by the peer, so it is the entry point every other stub is
/// reached from.
#[derive(Debug, Clone)]
pub struct Server {
    handle: RemoteHandle,
}

impl Server {
    /// Binds the bootstrap identity on the given broker.
    pub fn root(orb: &Rc<Orb>) -> Self {
        Self {
            handle: RemoteHandle::new(Rc::clone(orb), ROOT_SERVER_IDENTITY),
        }
    }

    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    /// Creates a fresh compiler session and returns its stub.
    pub fn create_session(&self) -> Result<Session> {
        let buf = self.handle.request("createSession")?;
        let mut reply = self.handle.invoke(buf)?;
        let session = self
            .handle
            .read_object(&mut reply)?
            .context("createSession returned a null session")?;
        Ok(Session::new(session))
    }

    pub fn get_dns_name(&self) -> Result<String> {
        let buf = self.handle.request("getDnsName")?;
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_string()?)
    }

    pub fn get_os_name(&self) -> Result<String> {
        let buf = self.handle.request("getOSName")?;
        let mut reply = self.handle.invoke(buf)?;
        Ok(reply.read_string()?)
    }

    /// Asks the compiler to exit. Oneway: no reply is produced, the ORB's
    /// own shutdown handles the frame-level goodbye.
    pub fn shutdown(&self) -> Result<()> {
        let buf = self.handle.request("shutdown")?;
        self.handle.invoke_oneway(buf)
    }
}
