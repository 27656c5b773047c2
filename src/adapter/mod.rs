// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Registry of locally hosted servants and the inbound-request dispatcher.
//!
//! The peer can initiate its own requests (callbacks) while the client is
//! waiting for a reply; the ORB routes those here by target identity. The
//! servant map is interior-mutable so a servant may register or remove
//! objects from inside its own dispatch.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracing::{debug, warn};

use crate::{
    cdr::buffer::CdrBuffer, errors::SystemError, models::reply::ReplyStatus,
    utils::generate_uuid,
};

/// A locally hosted object able to service operations dispatched to it.
///
/// The input buffer is positioned at the first argument byte; the output
/// buffer is positioned where result bytes belong. Returning
/// `Ok(UserException)` means the servant encoded an application exception
/// itself (exception type string, then reason). Returning `Err` lets the
/// adapter encode a system exception.
pub trait Servant: std::fmt::Debug {
    fn dispatch(
        &mut self,
        operation: &str,
        input: &mut CdrBuffer,
        output: &mut CdrBuffer,
    ) -> Result<ReplyStatus, SystemError>;
}

pub type ServantRef = Rc<RefCell<dyn Servant>>;

#[derive(Default)]
pub struct ObjectAdapter {
    servants: RefCell<HashMap<String, ServantRef>>,
}

impl ObjectAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a servant under a caller-chosen identity.
    pub fn add(&self, servant: ServantRef, id: &str) -> Result<(), SystemError> {
        let mut map = self.servants.borrow_mut();
        if map.contains_key(id) {
            return Err(SystemError::AlreadyRegistered(id.to_string()));
        }
        debug!(id, "servant registered");
        map.insert(id.to_string(), servant);
        Ok(())
    }

    /// Registers a servant under a freshly generated v4 UUID and returns the
    /// identity.
    pub fn add_with_uuid(&self, servant: ServantRef) -> Result<String, SystemError> {
        let id = generate_uuid();
        self.add(servant, &id)?;
        Ok(id)
    }

    /// Unregisters and returns the servant.
    pub fn remove(&self, id: &str) -> Result<ServantRef, SystemError> {
        self.servants
            .borrow_mut()
            .remove(id)
            .ok_or_else(|| SystemError::ObjectNotExist(id.to_string()))
    }

    pub fn id_to_servant(&self, id: &str) -> Result<ServantRef, SystemError> {
        self.servants
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| SystemError::ObjectNotExist(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.servants.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servants.borrow().is_empty()
    }

    /// Routes an inbound operation to its servant. Any system-level failure
    /// (unknown identity, servant busy in a nested dispatch, or an `Err` out
    /// of the servant itself) rewinds whatever the servant partially wrote
    /// and encodes the exception as `type_id` + message strings.
    pub fn dispatch(
        &self,
        id: &str,
        operation: &str,
        input: &mut CdrBuffer,
        output: &mut CdrBuffer,
    ) -> ReplyStatus {
        let reset = output.position();
        match self.try_dispatch(id, operation, input, output) {
            Ok(status) => status,
            Err(err) => {
                warn!(id, operation, %err, "dispatch raised a system exception");
                if let Err(e) = output.set_position(reset) {
                    warn!("reply buffer rewind failed: {e}");
                }
                output.write_string(err.type_id());
                output.write_string(err.message());
                ReplyStatus::SystemException
            },
        }
    }

    fn try_dispatch(
        &self,
        id: &str,
        operation: &str,
        input: &mut CdrBuffer,
        output: &mut CdrBuffer,
    ) -> Result<ReplyStatus, SystemError> {
        let servant = self.id_to_servant(id)?;
        let mut servant = servant
            .try_borrow_mut()
            .map_err(|_| SystemError::ServantNotActive(id.to_string()))?;
        servant.dispatch(operation, input, output)
    }
}

impl std::fmt::Debug for ObjectAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectAdapter")
            .field("servants", &self.len())
            .finish()
    }
}
