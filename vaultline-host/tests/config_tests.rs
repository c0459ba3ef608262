use pretty_assertions::assert_eq;
use std::io::Write;
use vaultline_crypto::KdfParams;
use vaultline_host::{ConfigError, HostConfig, HostState};
use vaultline_types::BackendKind;

#[test]
fn partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "log_filter": "debug", "default_backend": "memory" }}"#
    )
    .unwrap();

    let config = HostConfig::load(file.path()).unwrap();
    assert_eq!(config.log_filter, "debug");
    assert_eq!(config.default_backend, BackendKind::Memory);
    assert_eq!(config.catalog_file, HostConfig::default().catalog_file);
    assert_eq!(config.kdf, KdfParams::default());
}

#[test]
fn kdf_params_use_camel_case() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "kdf": {{ "memoryKib": 8, "iterations": 1, "parallelism": 1 }} }}"#
    )
    .unwrap();
    assert_eq!(
        HostConfig::load(file.path()).unwrap().kdf,
        KdfParams::low_cost()
    );
}

#[test]
fn invalid_files_are_rejected() {
    let mut bad_json = tempfile::NamedTempFile::new().unwrap();
    write!(bad_json, "{{ not json").unwrap();
    assert!(matches!(
        HostConfig::load(bad_json.path()),
        Err(ConfigError::Parse(_))
    ));

    let mut zero = tempfile::NamedTempFile::new().unwrap();
    write!(zero, r#"{{ "channel_buffer": 0 }}"#).unwrap();
    assert!(matches!(
        HostConfig::load(zero.path()),
        Err(ConfigError::Invalid(_))
    ));

    assert!(matches!(
        HostConfig::load(std::path::Path::new("/definitely/not/here.json")),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn host_state_opens_catalog_under_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig {
        data_dir: dir.path().join("nested"),
        kdf: KdfParams::low_cost(),
        ..HostConfig::default()
    };
    let state = HostState::open(&config).unwrap();
    assert_eq!(state.store().catalog().account_count().unwrap(), 0);
    assert!(config.catalog_path().exists());
}
