// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, time::Duration};

use anyhow::Result;
use serial_test::serial;
use wrmi_client_rs::{client::orb::Orb, utils::generate_uuid};

use super::common::{config_for, fake_compiler};

/// Full launch against a stand-in compiler speaking the real handshake over
/// real FIFOs: announce pipes, send one VALIDATE frame, swallow ours, exit.
#[test]
#[serial]
fn test_launch_validates_and_shuts_down() -> Result<()> {
    let run_id = generate_uuid();
    let send_pipe = std::env::temp_dir().join(format!("wrmi-it-in-{run_id}"));
    let recv_pipe = std::env::temp_dir().join(format!("wrmi-it-out-{run_id}"));

    let script = fake_compiler(&format!(
        "IN=\"{}\"\n\
         OUT=\"{}\"\n\
         mkfifo \"$IN\" \"$OUT\"\n\
         echo \"Reading from pipe $IN\"\n\
         echo \"Writing to pipe $OUT\"\n\
         printf 'WRMI\\002\\001\\005\\000\\000\\000\\000\\000' > \"$OUT\"\n\
         dd if=\"$IN\" of=/dev/null bs=1 count=12 2>/dev/null\n\
         exit 0",
        send_pipe.display(),
        recv_pipe.display(),
    ))?;

    let mut cfg = config_for(&script);
    cfg.runtime.shutdown_grace = Duration::from_secs(5);

    let orb = Orb::launch(&cfg)?;
    assert!(!orb.shutdown_requested());
    assert_eq!(orb.outstanding_buffers(), 0);

    // SHUTDOWN goes out, the child is reaped, the pipes are removed.
    orb.shutdown()?;
    assert!(orb.shutdown_requested());
    assert!(!send_pipe.exists());
    assert!(!recv_pipe.exists());

    // Idempotent after teardown.
    orb.shutdown()?;

    fs::remove_file(script)?;
    Ok(())
}
