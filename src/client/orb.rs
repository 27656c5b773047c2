// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The Object Request Broker: owns the transport, allocates request ids,
//! routes replies to waiters, dispatches server-initiated requests to the
//! object adapter, and coordinates shutdown with the child process.
//!
//! The broker is single-threaded and cooperative. Blocking happens only
//! inside `Channel::recv`; while a caller waits for its reply the broker
//! drains whatever arrives first, so a server callback issued mid-call is
//! serviced before the outer wait resumes.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
    time::Duration,
};

use anyhow::{Context, Result, ensure};
use tracing::{debug, info, warn};

use crate::{
    adapter::ObjectAdapter,
    cdr::buffer::CdrBuffer,
    cfg::config::Config,
    client::{
        pool_buffers::BufferPool,
        process::{ProcessProbe, ServerProcess},
        transport::Channel,
    },
    errors::{TimeoutError, TransportError},
    models::{
        message::MessageHeader,
        message_type::MessageType,
        reply::{ReplyHeader, ReplyStatus},
        request::RequestHeader,
    },
};

/// Reply-routing record. Inserted before the request goes out, filled by the
/// receive loop, removed by the caller.
#[derive(Debug)]
enum Waiter {
    Pending,
    Ready(CdrBuffer, ReplyHeader),
}

#[derive(Debug)]
pub struct Orb {
    channel: RefCell<Box<dyn Channel>>,
    pool: RefCell<BufferPool>,
    adapter: ObjectAdapter,
    waiters: RefCell<HashMap<u32, Waiter>>,
    process: RefCell<Option<Box<dyn ProcessProbe>>>,
    request_counter: Cell<u32>,
    shutdown_requested: Cell<bool>,
    max_wait_attempts: u32,
    shutdown_grace: Duration,
}

impl Orb {
    /// Builds a broker over an already-connected channel and performs the
    /// validation handshake: receive one frame, check eye-catcher and major
    /// version, then answer with our own VALIDATE.
    pub fn new(channel: Box<dyn Channel>, cfg: &Config) -> Result<Rc<Self>> {
        let orb = Rc::new(Self {
            channel: RefCell::new(channel),
            pool: RefCell::new(BufferPool::new(
                cfg.runtime.pool_buffer_capacity,
                cfg.runtime.byte_order,
            )),
            adapter: ObjectAdapter::new(),
            waiters: RefCell::new(HashMap::new()),
            process: RefCell::new(None),
            request_counter: Cell::new(0),
            shutdown_requested: Cell::new(false),
            max_wait_attempts: cfg.runtime.max_wait_attempts,
            shutdown_grace: cfg.runtime.shutdown_grace,
        });
        orb.validate_peer()?;
        Ok(orb)
    }

    /// Spawns the compiler, opens its announced pipe pair, and builds the
    /// broker on top with the process attached for liveness polling.
    pub fn launch(cfg: &Config) -> Result<Rc<Self>> {
        let process = ServerProcess::spawn(cfg)?;
        let channel = process
            .connect()
            .context("failed to open the announced pipes")?;
        let orb = Self::new(Box::new(channel), cfg)
            .context("validation handshake failed")?;
        orb.attach_process(Box::new(process));
        Ok(orb)
    }

    /// Hands the broker a process handle to poll before every blocking
    /// receive.
    pub fn attach_process(&self, probe: Box<dyn ProcessProbe>) {
        *self.process.borrow_mut() = Some(probe);
    }

    pub fn adapter(&self) -> &ObjectAdapter {
        &self.adapter
    }

    /// Monotonically increasing, wrapping. The waiter table keys on the full
    /// value so wraparound is harmless.
    pub fn next_request_id(&self) -> u32 {
        let id = self.request_counter.get();
        self.request_counter.set(id.wrapping_add(1));
        id
    }

    pub fn acquire_buffer(&self) -> CdrBuffer {
        self.pool.borrow_mut().acquire()
    }

    pub fn release_buffer(&self, buf: CdrBuffer) {
        self.pool.borrow_mut().release(buf);
    }

    /// Buffers currently outside the pool. Zero between operations.
    pub fn outstanding_buffers(&self) -> usize {
        self.pool.borrow().outstanding()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.get()
    }

    // ── send path ───────────────────────────────────────────────────────

    /// Finalizes the MessageHeader in the reserved prefix, flips the buffer,
    /// and writes the whole frame. The buffer goes back to the pool on every
    /// path.
    pub fn send_message(&self, mut buf: CdrBuffer, message_type: MessageType) -> Result<()> {
        let res = self.finalize_and_send(&mut buf, message_type);
        self.release_buffer(buf);
        if res.is_err() {
            self.shutdown_requested.set(true);
        }
        res
    }

    fn finalize_and_send(
        &self,
        buf: &mut CdrBuffer,
        message_type: MessageType,
    ) -> Result<()> {
        let total = buf.position();
        ensure!(
            total >= MessageHeader::SIZE,
            "message buffer is missing its header space"
        );
        let body_len = (total - MessageHeader::SIZE) as u32;
        buf.flip();
        MessageHeader::new(message_type, body_len).write_to(buf);
        buf.set_position(0)?;
        debug!(?message_type, frame_len = total, "send frame");
        self.channel.borrow_mut().send(buf)?;
        Ok(())
    }

    /// Sends a body-less control frame (VALIDATE, SHUTDOWN).
    fn send_control(&self, message_type: MessageType) -> Result<()> {
        let mut buf = self.acquire_buffer();
        buf.clear();
        match buf.set_position(MessageHeader::SIZE) {
            Ok(()) => self.send_message(buf, message_type),
            Err(e) => {
                self.release_buffer(buf);
                Err(e.into())
            },
        }
    }

    // ── waiters ─────────────────────────────────────────────────────────

    /// Must be called before the request frame is sent, so a fast reply
    /// cannot arrive unclaimed.
    pub fn register_waiter(&self, request_id: u32) {
        self.waiters
            .borrow_mut()
            .insert(request_id, Waiter::Pending);
    }

    /// Drops the record; a reply buffer parked in it goes back to the pool.
    pub fn remove_waiter(&self, request_id: u32) {
        if let Some(Waiter::Ready(buf, _)) =
            self.waiters.borrow_mut().remove(&request_id)
        {
            self.release_buffer(buf);
        }
    }

    fn take_ready(&self, request_id: u32) -> Option<(CdrBuffer, ReplyHeader)> {
        let mut waiters = self.waiters.borrow_mut();
        if matches!(waiters.get(&request_id), Some(Waiter::Ready(..)))
            && let Some(Waiter::Ready(buf, header)) = waiters.remove(&request_id)
        {
            return Some((buf, header));
        }
        None
    }

    /// Services inbound traffic until the registered reply shows up, bounded
    /// by the configured attempt count. The waiter entry is gone afterwards
    /// no matter how this returns.
    pub fn wait_for_reply(&self, request_id: u32) -> Result<(CdrBuffer, ReplyHeader)> {
        for _ in 0..self.max_wait_attempts {
            if let Some(ready) = self.take_ready(request_id) {
                return Ok(ready);
            }
            if let Err(e) = self.wait_for_and_perform_work() {
                self.remove_waiter(request_id);
                return Err(e);
            }
        }
        if let Some(ready) = self.take_ready(request_id) {
            return Ok(ready);
        }
        self.remove_waiter(request_id);
        Err(TimeoutError {
            attempts: self.max_wait_attempts,
        }
        .into())
    }

    // ── receive path ────────────────────────────────────────────────────

    /// Blocks for one inbound frame and services it: replies are routed to
    /// their waiters, requests are dispatched and answered, shutdown and
    /// validate frames are acknowledged.
    pub fn wait_for_and_perform_work(&self) -> Result<()> {
        self.check_peer_alive()?;
        let mut buf = self.acquire_buffer();
        match self.read_frame(&mut buf) {
            Ok((header, message_type)) => self.route_frame(buf, header, message_type),
            Err(e) => {
                if e.downcast_ref::<TransportError>().is_some() {
                    self.shutdown_requested.set(true);
                }
                self.release_buffer(buf);
                Err(e)
            },
        }
    }

    /// Reads MessageHeader plus body into `buf`. On success the buffer is in
    /// read mode positioned at the first body byte.
    fn read_frame(&self, buf: &mut CdrBuffer) -> Result<(MessageHeader, MessageType)> {
        buf.clear();
        buf.set_limit(MessageHeader::SIZE)?;
        self.recv_into(buf)?;
        buf.flip();

        let header = MessageHeader::read_from(buf)?;
        header.validate()?;
        let message_type = header.message_type()?;

        let body_len = header.message_length as usize;
        if body_len > 0 {
            buf.reserve(body_len);
            buf.set_limit(MessageHeader::SIZE + body_len)?;
            self.recv_into(buf)?;
            buf.set_position(MessageHeader::SIZE)?;
        }
        debug!(
            ?message_type,
            body_len,
            flags = header.flags,
            "frame received"
        );
        Ok((header, message_type))
    }

    fn recv_into(&self, buf: &mut CdrBuffer) -> Result<(), TransportError> {
        self.channel.borrow_mut().recv(buf)
    }

    fn route_frame(
        &self,
        buf: CdrBuffer,
        header: MessageHeader,
        message_type: MessageType,
    ) -> Result<()> {
        match message_type {
            MessageType::Reply => self.route_reply(buf),
            MessageType::Request => self.serve_request(buf, header.flags, true),
            MessageType::Oneway => self.serve_request(buf, header.flags, false),
            MessageType::Shutdown => {
                self.release_buffer(buf);
                self.handle_shutdown_frame()
            },
            MessageType::Validate => {
                debug!("peer validate frame accepted");
                self.release_buffer(buf);
                Ok(())
            },
        }
    }

    fn route_reply(&self, mut buf: CdrBuffer) -> Result<()> {
        let reply_header = match ReplyHeader::read_from(&mut buf) {
            Ok(h) => h,
            Err(e) => {
                self.release_buffer(buf);
                return Err(e.into());
            },
        };

        let routed = {
            let mut waiters = self.waiters.borrow_mut();
            match waiters.get_mut(&reply_header.request_id) {
                Some(waiter) => {
                    *waiter = Waiter::Ready(buf, reply_header);
                    None
                },
                None => Some(buf),
            }
        };

        if let Some(orphan) = routed {
            warn!("orphan reply released");
            self.release_buffer(orphan);
        }
        Ok(())
    }

    /// Dispatches an inbound REQUEST or ONEWAY through the object adapter.
    /// For requests a reply frame mirroring the inbound flags byte goes back
    /// with the same request id.
    fn serve_request(&self, mut buf: CdrBuffer, flags: u8, wants_reply: bool) -> Result<()> {
        let request = match RequestHeader::read_from(&mut buf) {
            Ok(h) => h,
            Err(e) => {
                self.release_buffer(buf);
                return Err(e.into());
            },
        };
        debug!(
            request_id = request.request_id,
            target = %request.target_object,
            operation = %request.operation,
            oneway = !wants_reply,
            "inbound request"
        );

        let mut out = self.acquire_buffer();
        out.clear();
        if let Err(e) = out.set_position(MessageHeader::SIZE + ReplyHeader::SIZE) {
            self.release_buffer(buf);
            self.release_buffer(out);
            return Err(e.into());
        }

        let status = self.adapter.dispatch(
            &request.target_object,
            &request.operation,
            &mut buf,
            &mut out,
        );
        self.release_buffer(buf);

        if wants_reply {
            self.send_reply(out, request.request_id, status, flags)
        } else {
            self.release_buffer(out);
            Ok(())
        }
    }

    fn send_reply(
        &self,
        mut out: CdrBuffer,
        request_id: u32,
        status: ReplyStatus,
        flags: u8,
    ) -> Result<()> {
        let res = self.finalize_and_send_reply(&mut out, request_id, status, flags);
        self.release_buffer(out);
        res
    }

    fn finalize_and_send_reply(
        &self,
        out: &mut CdrBuffer,
        request_id: u32,
        status: ReplyStatus,
        flags: u8,
    ) -> Result<()> {
        let total = out.position();
        let body_len = (total - MessageHeader::SIZE) as u32;
        out.flip();
        let mut header = MessageHeader::new(MessageType::Reply, body_len);
        header.flags = flags;
        header.write_to(out);
        ReplyHeader::new(request_id, status).write_to(out);
        out.set_position(0)?;
        debug!(request_id, ?status, frame_len = total, "send reply");
        self.channel.borrow_mut().send(out)?;
        Ok(())
    }

    fn handle_shutdown_frame(&self) -> Result<()> {
        if self.shutdown_requested.replace(true) {
            debug!("shutdown frame while already shutting down; ignored");
            return Ok(());
        }
        info!("peer requested shutdown; acknowledging");
        self.send_control(MessageType::Shutdown)
    }

    fn check_peer_alive(&self) -> Result<()> {
        let mut process = self.process.borrow_mut();
        if let Some(probe) = process.as_mut()
            && !probe.is_alive()
        {
            let stderr = probe.read_stderr();
            self.shutdown_requested.set(true);
            return Err(TransportError::peer_died(&stderr).into());
        }
        Ok(())
    }

    // ── handshake & shutdown ────────────────────────────────────────────

    /// Receives the peer's opening frame, checks the sentinel and major
    /// version, and answers with our own VALIDATE.
    fn validate_peer(&self) -> Result<()> {
        let mut buf = self.acquire_buffer();
        let received = self.read_frame(&mut buf);
        self.release_buffer(buf);

        let (header, message_type) = received.context("validation receive failed")?;
        if message_type != MessageType::Validate {
            warn!(?message_type, "peer opened with a non-validate frame");
        }
        debug!(
            major = header.protocol_major,
            minor = header.protocol_minor,
            "peer protocol validated"
        );
        self.send_control(MessageType::Validate)
            .context("failed to send validate frame")
    }

    /// Sends at most one SHUTDOWN frame and tears the child process down.
    /// Safe to call repeatedly.
    pub fn shutdown(&self) -> Result<()> {
        if !self.shutdown_requested.replace(true) {
            info!("sending shutdown");
            if let Err(e) = self.send_control(MessageType::Shutdown) {
                warn!("shutdown frame failed: {e}");
            }
        }
        if let Some(mut probe) = self.process.borrow_mut().take() {
            probe
                .shutdown(self.shutdown_grace)
                .context("compiler teardown failed")?;
        }
        Ok(())
    }
}
