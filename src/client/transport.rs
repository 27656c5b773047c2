// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Duplex byte channel over the peer's two named pipes.
//!
//! The peer creates both FIFOs and announces their paths on stdout; we open
//! them in binary read+write mode. There is no timeout at this layer; the
//! ORB bounds its own waiting.

use std::{
    fmt::Debug,
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{cdr::buffer::CdrBuffer, errors::TransportError};

/// Blocking send/recv of exact byte counts. The scripted test channel and
/// the pipe channel below are the two implementations.
pub trait Channel: Debug {
    /// Writes the buffer's active slice `[position..limit)` in full and
    /// flushes.
    fn send(&mut self, buf: &CdrBuffer) -> Result<(), TransportError>;

    /// Reads exactly `buf.remaining()` bytes, appending at `position`.
    fn recv(&mut self, buf: &mut CdrBuffer) -> Result<(), TransportError>;
}

/// Channel over the peer-created pipe pair.
#[derive(Debug)]
pub struct PipeChannel {
    reader: File,
    writer: File,
    recv_path: PathBuf,
    send_path: PathBuf,
}

impl PipeChannel {
    /// `send_path` is the pipe the peer reads, `recv_path` the pipe the peer
    /// writes.
    pub fn connect(send_path: &Path, recv_path: &Path) -> Result<Self, TransportError> {
        let writer = open_pipe(send_path)?;
        let reader = open_pipe(recv_path)?;
        debug!(
            send = %send_path.display(),
            recv = %recv_path.display(),
            "pipe channel connected"
        );
        Ok(Self {
            reader,
            writer,
            recv_path: recv_path.to_path_buf(),
            send_path: send_path.to_path_buf(),
        })
    }

    pub fn send_path(&self) -> &Path {
        &self.send_path
    }

    pub fn recv_path(&self) -> &Path {
        &self.recv_path
    }
}

fn open_pipe(path: &Path) -> Result<File, TransportError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| TransportError::io(format!("failed to open pipe {path:?}"), e))
}

impl Channel for PipeChannel {
    fn send(&mut self, buf: &CdrBuffer) -> Result<(), TransportError> {
        let bytes = buf.as_slice();
        self.writer
            .write_all(bytes)
            .map_err(|e| TransportError::io(format!("send of {} bytes", bytes.len()), e))?;
        self.writer
            .flush()
            .map_err(|e| TransportError::io("flush after send", e))?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut CdrBuffer) -> Result<(), TransportError> {
        while buf.remaining() > 0 {
            let n = match self.reader.read(buf.writable()) {
                Ok(0) => return Err(TransportError::premature_eof()),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(TransportError::io(
                        format!("recv with {} bytes outstanding", buf.remaining()),
                        e,
                    ));
                },
            };
            buf.advance(n)
                .map_err(|e| TransportError::new(format!("recv cursor advance: {e}")))?;
        }
        Ok(())
    }
}
