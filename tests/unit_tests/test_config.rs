// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use wrmi_client_rs::{
    cdr::buffer::ByteOrder,
    cfg::{cli::resolve_config_path, config::Config},
};

#[test]
fn test_load_test_config() {
    let cfg = resolve_config_path("tests/config.yaml")
        .and_then(Config::load_from_file)
        .expect("test config loads");

    assert_eq!(cfg.server.path, "wpslinks");
    assert_eq!(cfg.runtime.pool_buffer_capacity, 65536);
    assert_eq!(cfg.runtime.max_wait_attempts, 1000);
    assert_eq!(cfg.runtime.shutdown_grace, Duration::from_secs(2));
    assert_eq!(cfg.runtime.byte_order, ByteOrder::Big);
}

#[test]
fn test_defaults_fill_missing_runtime_keys() {
    let cfg: Config = serde_yaml::from_str(
        "server:\n  Path: wpslinks\nruntime: {}\n",
    )
    .expect("minimal config parses");
    cfg.validate().expect("valid");

    assert_eq!(cfg.runtime.pool_buffer_capacity, 64 * 1024);
    assert_eq!(cfg.runtime.max_wait_attempts, 1000);
    assert_eq!(cfg.runtime.shutdown_grace, Duration::from_secs(5));
    assert_eq!(cfg.runtime.byte_order, ByteOrder::Big);
}

#[test]
fn test_option_args_are_sorted_pairs() {
    let cfg = resolve_config_path("tests/config.yaml")
        .and_then(Config::load_from_file)
        .expect("test config loads");

    assert_eq!(
        cfg.server.option_args(),
        vec![
            "-encoding".to_string(),
            "utf8".to_string(),
            "-memsize".to_string(),
            "2G".to_string(),
        ]
    );
}

#[test]
fn test_validation_rejects_nonsense() {
    let mut cfg = Config::default();
    cfg.runtime.pool_buffer_capacity = 4;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.runtime.max_wait_attempts = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.path = String::new();
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.server
        .options
        .insert("-memsize".to_string(), "2G".to_string());
    assert!(cfg.validate().is_err());
}

#[test]
fn test_little_endian_deployment_parses() {
    let cfg: Config = serde_yaml::from_str(
        "server:\n  Path: wpslinks\nruntime:\n  ByteOrder: little\n",
    )
    .expect("config parses");
    assert_eq!(cfg.runtime.byte_order, ByteOrder::Little);
}
