//! Integration tests for configuration loading and validation

use relay_core::config::{
    load_from_json, load_from_path, load_from_yaml, ConfigError, RelayConfig, ValidationErrorKind,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_valid_yaml_config() {
    std::env::set_var("RELAY_TEST_YAML_R1_KEY", "r1-secret");

    let yaml = r#"
listen_addr: 127.0.0.1:8080
agent:
  base_url: https://agent.example
  connect_timeout_secs: 5
credentials:
  default:
    app_id: normal-app
    secret_key: normal-secret
  deep_thinking:
    app_id: r1-app
    secret_key: ${RELAY_TEST_YAML_R1_KEY}
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.yaml", yaml);

    let config = load_from_yaml(path).unwrap();
    assert_eq!(config.listen_addr, "127.0.0.1:8080");
    assert_eq!(config.agent.base_url, "https://agent.example");
    assert_eq!(config.agent.connect_timeout_secs, 5);
    assert_eq!(
        config.credentials.deep_thinking.secret_key().unwrap().expose_secret(),
        "r1-secret"
    );
}

#[test]
fn test_load_valid_json_config() {
    let json = r#"{
  "credentials": {
    "default": { "app_id": "normal-app", "secret_key": "normal-secret" },
    "deep_thinking": { "app_id": "r1-app", "secret_key": "r1-secret" }
  }
}"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.json", json);

    let config = load_from_json(&path).unwrap();
    assert_eq!(config.listen_addr, "0.0.0.0:3000");
    assert_eq!(config.credentials.default.app_id(), Some("normal-app"));

    // Dispatch by extension reaches the same loader
    assert!(RelayConfig::from_file(&path).is_ok());
}

#[test]
fn test_missing_env_var_in_yaml() {
    let yaml = r#"
credentials:
  default:
    app_id: normal-app
    secret_key: ${RELAY_TEST_UNSET_VARIABLE}
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.yml", yaml);

    match load_from_path(path) {
        Err(ConfigError::EnvVarNotFound { var }) => {
            assert_eq!(var, "RELAY_TEST_UNSET_VARIABLE");
        }
        other => panic!("expected missing variable error, got {:?}", other),
    }
}

#[test]
fn test_incomplete_credentials_fail_validation() {
    let yaml = r#"
credentials:
  default:
    app_id: normal-app
    secret_key: normal-secret
  deep_thinking:
    app_id: r1-app
    secret_key: "  "
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::ValidationError(e)) => {
            assert_eq!(e.field_path, "credentials.deep_thinking.secret_key");
            assert!(matches!(e.kind, ValidationErrorKind::RequiredFieldMissing));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_invalid_yaml_reports_location() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.yaml", "credentials: [unclosed");

    match load_from_yaml(path) {
        Err(ConfigError::ParseError { path, .. }) => assert!(path.ends_with("relay.yaml")),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_missing_file() {
    let result = load_from_yaml("/nonexistent/relay.yaml");
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

#[test]
fn test_secrets_not_in_debug_output() {
    let json = r#"{
  "credentials": {
    "default": { "app_id": "normal-app", "secret_key": "very-secret-value" },
    "deep_thinking": { "app_id": "r1-app", "secret_key": "another-secret" }
  }
}"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.json", json);
    let config = load_from_json(path).unwrap();

    let debug = format!("{:?}", config);
    assert!(!debug.contains("very-secret-value"));
    assert!(!debug.contains("another-secret"));
    assert!(debug.contains("[REDACTED]"));
}
