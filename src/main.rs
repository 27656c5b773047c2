// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use tracing::info;
use wrmi_client_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    client::orb::Orb,
    stubs::server::Server,
};

fn main() -> Result<()> {
    let _init_logger = init_logger("tests/config_logger.yaml")?;

    // Load config
    let cfg = resolve_config_path("tests/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    // Start the compiler and validate the protocol handshake
    let orb = Orb::launch(&cfg).context("failed to launch the compiler")?;

    let server = Server::root(&orb);
    let dns = server.get_dns_name()?;
    let os = server.get_os_name()?;
    info!(%dns, %os, "connected to compiler");

    // One session, one trivial program, then read the log back
    let session = server.create_session().context("createSession failed")?;
    session.init().context("session init failed")?;

    let rc = session
        .submit_text("data _null_; put 'hello from wrmi-client-rs'; run;")
        .context("submit failed")?;
    info!(rc, "program submitted");

    let log = session.open_log()?;
    let total = log.get_line_count()?;
    let first = total.saturating_sub(25);
    let (_, lines) = log.get_lines(first, 25)?;
    for line in &lines {
        println!("{}", line.text);
    }

    orb.shutdown().context("shutdown failed")?;
    Ok(())
}
