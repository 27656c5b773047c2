// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Lifecycle of the co-located `wpslinks` compiler process.
//!
//! The compiler is started with `-namedpipe` plus the configured
//! `-name value` option pairs. It creates both pipes itself and announces
//! them on stdout as two lines, in either order:
//!
//! ```text
//! Reading from pipe <path>      the pipe we will send into
//! Writing to pipe <path>        the pipe we will receive from
//! ```
//!
//! Anything else on stdout during startup is a fatal error. The broker keeps
//! the handle for liveness polling through the [`ProcessProbe`] capability.

use std::{
    fmt::Debug,
    fs,
    io::{BufRead, BufReader, ErrorKind, Read},
    path::{Path, PathBuf},
    process::{Child, ChildStderr, ChildStdout, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail, ensure};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    cfg::config::Config, client::transport::PipeChannel, errors::TransportError,
};

const READING_PREFIX: &str = "Reading from pipe ";
const WRITING_PREFIX: &str = "Writing to pipe ";

/// The slice of a child process the ORB depends on. Tests substitute their
/// own implementation; production uses [`ServerProcess`].
pub trait ProcessProbe: Debug {
    fn is_alive(&mut self) -> bool;

    /// Drains whatever the child wrote to stderr. Only meaningful once the
    /// child has exited; the result is cached.
    fn read_stderr(&mut self) -> String;

    /// Waits up to `grace` for a voluntary exit, kills the child otherwise,
    /// and removes the pipe files.
    fn shutdown(&mut self, grace: Duration) -> Result<()>;
}

#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
    stderr: Option<ChildStderr>,
    captured_stderr: OnceCell<String>,
    /// Pipe the compiler reads, i.e. our send target.
    send_pipe: PathBuf,
    /// Pipe the compiler writes, i.e. our receive source.
    recv_pipe: PathBuf,
}

impl ServerProcess {
    /// Starts the compiler and parses the pipe announcement.
    pub fn spawn(cfg: &Config) -> Result<Self> {
        let mut command = Command::new(&cfg.server.path);
        command.arg("-namedpipe");
        for arg in cfg.server.option_args() {
            command.arg(arg);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start compiler {:?}", cfg.server.path))?;
        info!(path = %cfg.server.path, pid = child.id(), "compiler started");

        let stdout = child
            .stdout
            .take()
            .context("compiler stdout was not piped")?;

        match read_handshake(stdout) {
            Ok((send_pipe, recv_pipe)) => {
                let stderr = child.stderr.take();
                debug!(
                    send = %send_pipe.display(),
                    recv = %recv_pipe.display(),
                    "pipe announcement parsed"
                );
                Ok(Self {
                    child,
                    stderr,
                    captured_stderr: OnceCell::new(),
                    send_pipe,
                    recv_pipe,
                })
            },
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            },
        }
    }

    /// Opens the announced pipe pair as a duplex channel.
    pub fn connect(&self) -> Result<PipeChannel, TransportError> {
        PipeChannel::connect(&self.send_pipe, &self.recv_pipe)
    }

    pub fn send_pipe(&self) -> &Path {
        &self.send_pipe
    }

    pub fn recv_pipe(&self) -> &Path {
        &self.recv_pipe
    }

    fn remove_pipes(&self) {
        for path in [&self.send_pipe, &self.recv_pipe] {
            if let Err(e) = fs::remove_file(path)
                && e.kind() != ErrorKind::NotFound
            {
                warn!(path = %path.display(), "failed to remove pipe: {e}");
            }
        }
    }
}

/// Parses the two startup lines, tolerating either order and nothing else.
fn read_handshake(stdout: ChildStdout) -> Result<(PathBuf, PathBuf)> {
    let mut reader = BufReader::new(stdout);
    let mut send_pipe: Option<PathBuf> = None;
    let mut recv_pipe: Option<PathBuf> = None;

    while send_pipe.is_none() || recv_pipe.is_none() {
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .context("reading compiler startup output")?;
        ensure!(n > 0, "compiler exited before announcing both pipes");

        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(rest) = line.strip_prefix(READING_PREFIX) {
            ensure!(
                send_pipe.is_none(),
                "duplicate pipe announcement: {line:?}"
            );
            send_pipe = Some(PathBuf::from(rest));
        } else if let Some(rest) = line.strip_prefix(WRITING_PREFIX) {
            ensure!(
                recv_pipe.is_none(),
                "duplicate pipe announcement: {line:?}"
            );
            recv_pipe = Some(PathBuf::from(rest));
        } else {
            bail!("unexpected compiler startup line: {line:?}");
        }
    }

    match (send_pipe, recv_pipe) {
        (Some(send), Some(recv)) => Ok((send, recv)),
        _ => bail!("compiler announced an incomplete pipe pair"),
    }
}

impl ProcessProbe for ServerProcess {
    fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(%status, "compiler has exited");
                false
            },
            Err(e) => {
                warn!("liveness poll failed: {e}");
                true
            },
        }
    }

    fn read_stderr(&mut self) -> String {
        self.captured_stderr
            .get_or_init(|| match self.stderr.take() {
                Some(mut pipe) => {
                    let mut out = String::new();
                    if let Err(e) = pipe.read_to_string(&mut out) {
                        warn!("failed to read compiler stderr: {e}");
                    }
                    out
                },
                None => String::new(),
            })
            .clone()
    }

    fn shutdown(&mut self, grace: Duration) -> Result<()> {
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    info!(%status, "compiler exited");
                    break;
                },
                Ok(None) if Instant::now() >= deadline => {
                    warn!("compiler ignored shutdown; killing");
                    self.child.kill().context("failed to kill compiler")?;
                    self.child.wait().context("failed to reap compiler")?;
                    break;
                },
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(e) => return Err(e).context("polling compiler exit status"),
            }
        }
        self.remove_pipes();
        Ok(())
    }
}
