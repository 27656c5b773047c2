// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    cdr::buffer::ByteOrder,
    models::{
        common::DEFAULT_BUFFER_CAPACITY, message::MessageHeader, reply::ReplyHeader,
    },
};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// How to start and parameterize the compiler child process.
    pub server: ServerConfig,
    /// Broker-side knobs that never travel on the wire.
    pub runtime: RuntimeConfig,
}

/// Launch parameters for the `wpslinks` child process.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(rename = "Path")]
    /// Executable path or name resolvable through `PATH`.
    pub path: String,

    #[serde(default, rename = "Options")]
    /// Session options appended to the command line as `-name value` pairs.
    pub options: HashMap<String, String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(rename = "PoolBufferCapacity", default = "default_pool_buffer_capacity")]
    /// Capacity of freshly allocated pooled buffers.
    pub pool_buffer_capacity: usize,

    #[serde(rename = "MaxWaitAttempts", default = "default_max_wait_attempts")]
    /// Upper bound on header reads while waiting for one reply.
    pub max_wait_attempts: u32,

    #[serde(
        rename = "ShutdownGrace",
        with = "serde_secs",
        default = "default_shutdown_grace"
    )]
    /// How long the child may take to exit after SHUTDOWN before it is
    /// killed.
    pub shutdown_grace: Duration,

    #[serde(rename = "ByteOrder", default)]
    /// Wire byte order. Must match the peer build.
    pub byte_order: ByteOrder,
}

fn default_pool_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_max_wait_attempts() -> u32 {
    1000
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                path: "wpslinks".to_string(),
                options: HashMap::new(),
            },
            runtime: RuntimeConfig {
                pool_buffer_capacity: default_pool_buffer_capacity(),
                max_wait_attempts: default_max_wait_attempts(),
                shutdown_grace: default_shutdown_grace(),
                byte_order: ByteOrder::default(),
            },
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates invariants the broker relies on.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.server.path.is_empty(), "server.Path must not be empty");

        for name in self.server.options.keys() {
            ensure!(!name.is_empty(), "session option names must not be empty");
            ensure!(
                !name.starts_with('-'),
                "session option {name:?} must not carry its own dash"
            );
        }

        ensure!(
            self.runtime.pool_buffer_capacity >= MessageHeader::SIZE + ReplyHeader::SIZE,
            "PoolBufferCapacity must hold at least the frame headers"
        );
        ensure!(
            self.runtime.max_wait_attempts >= 1,
            "MaxWaitAttempts must be >= 1"
        );

        Ok(())
    }
}

impl ServerConfig {
    /// Renders the option map as a deterministic argument list: pairs sorted
    /// by name, each emitted as `-name value`.
    pub fn option_args(&self) -> Vec<String> {
        let mut pairs: Vec<(&String, &String)> = self.options.iter().collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut out = Vec::with_capacity(pairs.len() * 2);
        for (name, value) in pairs {
            out.push(format!("-{name}"));
            out.push(value.clone());
        }
        out
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
