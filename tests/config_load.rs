// tests/config_load.rs
use std::io::Write;

use personal_digest::config::{AppConfig, ENV_CONFIG_PATH};
use personal_digest::error::classify;
use serial_test::serial;

const VARS: &[&str] = &[
    ENV_CONFIG_PATH,
    "GEMINI_API_KEY",
    "LLM_TEST_MODE",
    "INTERVAL_MINUTES",
    "OUTPUT_DIR",
    "ENABLE_IMESSAGE",
    "IMESSAGE_DB_PATH",
];

fn clear() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

#[test]
#[serial]
fn file_then_env_layers() {
    clear();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        f,
        "interval_minutes = 15\noutput_dir = \"/srv/digest\"\n[llm]\napi_key = \"ENV\"\n[weather]\nlatitude = 48.2\n"
    )
    .unwrap();
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var("GEMINI_API_KEY", " secret ");
    std::env::set_var("INTERVAL_MINUTES", "5");

    let cfg = AppConfig::load(None).unwrap();
    clear();

    assert_eq!(cfg.interval_minutes, 5);
    assert_eq!(cfg.output_dir, std::path::PathBuf::from("/srv/digest"));
    assert_eq!(cfg.llm.api_key, "secret");
    assert_eq!(cfg.weather.latitude, 48.2);
}

#[test]
#[serial]
fn missing_api_key_is_a_config_error() {
    clear();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digest.toml");
    std::fs::write(&path, "interval_minutes = 60\n").unwrap();

    let err = AppConfig::load(Some(&path)).unwrap_err();
    assert_eq!(classify(&err), "CONFIG_ERROR");
}

#[test]
#[serial]
fn mock_mode_needs_no_key() {
    clear();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digest.toml");
    std::fs::write(&path, "").unwrap();
    std::env::set_var("LLM_TEST_MODE", "mock");

    let cfg = AppConfig::load(Some(&path));
    clear();
    assert!(cfg.is_ok());
}

#[test]
#[serial]
fn explicit_missing_file_is_an_error() {
    clear();
    std::env::set_var("LLM_TEST_MODE", "mock");
    let res = AppConfig::load(Some(std::path::Path::new("/nonexistent/digest.toml")));
    clear();
    assert!(res.is_err());
}
