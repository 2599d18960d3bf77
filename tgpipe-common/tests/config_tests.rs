//! Configuration resolution tests
//!
//! Note: Uses serial_test to prevent ENV variable race conditions. Tests
//! that manipulate TGPIPE_* variables are marked with #[serial] to ensure
//! they run sequentially, not in parallel.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tgpipe_common::config::{ConfigOverrides, PipelineConfig, RerunPolicy};

fn clear_tgpipe_env() {
    for var in [
        "TGPIPE_CONFIG",
        "TGPIPE_DATA_ROOT",
        "TGPIPE_GATEWAY_URL",
        "TGPIPE_GATEWAY_TOKEN",
        "TGPIPE_CHANNEL",
        "TGPIPE_MESSAGE_LIMIT",
        "TGPIPE_DETECTOR_CMD",
        "TGPIPE_DETECTOR_NAMES",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_apply_with_no_overrides() {
    clear_tgpipe_env();

    let cfg = PipelineConfig::load(ConfigOverrides::default()).unwrap();

    assert!(!cfg.data_root.as_os_str().is_empty());
    assert_eq!(cfg.telegram.gateway_url, "http://127.0.0.1:8787");
    assert_eq!(cfg.telegram.message_limit, 50);
    assert!(cfg.telegram.channel.is_none());
    assert_eq!(cfg.detector.command, "yolo-detect");
    assert_eq!(cfg.rerun, RerunPolicy::Replace);
}

#[test]
#[serial]
fn env_overrides_defaults() {
    clear_tgpipe_env();
    env::set_var("TGPIPE_DATA_ROOT", "/tmp/tgpipe-test-env-root");
    env::set_var("TGPIPE_CHANNEL", "somechannel");
    env::set_var("TGPIPE_MESSAGE_LIMIT", "25");

    let cfg = PipelineConfig::load(ConfigOverrides::default()).unwrap();

    assert_eq!(cfg.data_root, PathBuf::from("/tmp/tgpipe-test-env-root"));
    assert_eq!(cfg.telegram.channel.as_deref(), Some("somechannel"));
    assert_eq!(cfg.telegram.message_limit, 25);

    clear_tgpipe_env();
}

#[test]
#[serial]
fn cli_takes_precedence_over_env() {
    clear_tgpipe_env();
    env::set_var("TGPIPE_DATA_ROOT", "/tmp/tgpipe-from-env");
    env::set_var("TGPIPE_CHANNEL", "envchannel");

    let cfg = PipelineConfig::load(ConfigOverrides {
        data_root: Some(PathBuf::from("/tmp/tgpipe-from-cli")),
        channel: Some("clichannel".to_string()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(cfg.data_root, PathBuf::from("/tmp/tgpipe-from-cli"));
    assert_eq!(cfg.telegram.channel.as_deref(), Some("clichannel"));

    clear_tgpipe_env();
}

#[test]
#[serial]
fn toml_file_supplies_values_under_env() {
    clear_tgpipe_env();

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
data_root = "/tmp/tgpipe-from-toml"

[telegram]
gateway_url = "http://gateway.internal:9000"
channel = "tomlchannel"
message_limit = 10

[detector]
command = "yolo-detect-v8"
min_confidence = 0.5

[enrich]
rerun = "append"
"#,
    )
    .unwrap();

    let cfg = PipelineConfig::load(ConfigOverrides {
        config_file: Some(config_path),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(cfg.data_root, PathBuf::from("/tmp/tgpipe-from-toml"));
    assert_eq!(cfg.telegram.gateway_url, "http://gateway.internal:9000");
    assert_eq!(cfg.telegram.channel.as_deref(), Some("tomlchannel"));
    assert_eq!(cfg.telegram.message_limit, 10);
    assert_eq!(cfg.detector.command, "yolo-detect-v8");
    assert_eq!(cfg.detector.min_confidence, 0.5);
    assert_eq!(cfg.rerun, RerunPolicy::Append);

    // Environment still beats TOML
    env::set_var("TGPIPE_CHANNEL", "envwins");
    let cfg = PipelineConfig::load(ConfigOverrides {
        config_file: Some(dir.path().join("config.toml")),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(cfg.telegram.channel.as_deref(), Some("envwins"));

    clear_tgpipe_env();
}

#[test]
#[serial]
fn explicit_config_file_must_exist() {
    clear_tgpipe_env();

    let result = PipelineConfig::load(ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/tgpipe.toml")),
        ..Default::default()
    });

    assert!(result.is_err());
}

#[test]
#[serial]
fn missing_conventional_config_degrades_to_defaults() {
    clear_tgpipe_env();
    // No TGPIPE_CONFIG and (almost certainly) no user config file named
    // after a random tempdir; resolution must still succeed.
    let dir = tempfile::tempdir().unwrap();
    env::set_var("TGPIPE_DATA_ROOT", dir.path());

    let cfg = PipelineConfig::load(ConfigOverrides::default()).unwrap();
    assert_eq!(cfg.data_root, dir.path());

    clear_tgpipe_env();
}
