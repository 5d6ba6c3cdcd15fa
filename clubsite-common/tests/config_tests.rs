//! Integration tests for configuration resolution
//!
//! Uses serial_test because tests manipulate CLUBSITE_CONFIG and the secret
//! override variables in the process environment.

use clubsite_common::config::{
    BackendKind, ConfigResolver, ServiceConfig, CONFIG_ENV_VAR, ENV_STORAGE_BUCKET,
};
use clubsite_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
#[serial]
fn test_cli_path_has_highest_priority() {
    let cli_file = write_config("[server]\nbind = \"0.0.0.0:8080\"\n");
    let env_file = write_config("[server]\nbind = \"0.0.0.0:9090\"\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let resolver = ConfigResolver::new(Some(cli_file.path().to_path_buf()));
    let config = resolver.load().expect("config loads");

    assert_eq!(config.server.bind, "0.0.0.0:8080");
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_path_used_without_cli_arg() {
    let env_file = write_config("[backend]\nkind = \"memory\"\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let config = ConfigResolver::new(None).load().expect("config loads");

    assert_eq!(config.backend.kind, BackendKind::Memory);
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_explicit_missing_file_is_not_found() {
    let resolver = ConfigResolver::new(Some(PathBuf::from("/nonexistent/clubsite.toml")));
    let err = resolver.load().unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
#[serial]
fn test_process_env_overrides_file_bucket() {
    let file = write_config("[storage]\nbucket = \"from-file\"\n");
    env::set_var(ENV_STORAGE_BUCKET, "from-env");

    let config = ConfigResolver::new(Some(file.path().to_path_buf()))
        .load()
        .expect("config loads");

    assert_eq!(config.storage.bucket.as_deref(), Some("from-env"));
    env::remove_var(ENV_STORAGE_BUCKET);
}

#[test]
fn test_full_example_config_parses() {
    let config = ServiceConfig::from_toml_str(
        r#"
        [server]
        bind = "0.0.0.0:5780"
        max_upload_bytes = 5242880

        [backend]
        kind = "google"

        [auth]
        identity_api_key = "AIza-example"
        static_tokens = [
            { sha256 = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08", subject = "dev-admin" },
        ]

        [storage]
        bucket = "club-media"

        [firestore]
        project_id = "club-site"

        [legacy]
        csv_dir = "/srv/clubsite/legacy"

        [timeouts]
        verify_ms = 5000
        upload_ms = 60000
        write_ms = 8000
        "#,
    )
    .expect("example config parses");

    config.validate().expect("example config is valid");
    assert_eq!(config.server.max_upload_bytes, 5_242_880);
    assert!(config.auth.static_tokens[0].admin);
    assert_eq!(config.legacy.csv_dir, PathBuf::from("/srv/clubsite/legacy"));
    assert_eq!(config.timeouts.write_ms, 8000);
}
