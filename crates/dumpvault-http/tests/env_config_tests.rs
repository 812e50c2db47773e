//! Integration tests for environment-based HTTP configuration

use dumpvault_http::runtime::{ConfigError, HttpRuntimeConfigBuilder};
use serial_test::serial;
use std::env;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

/// Helper to set environment variable for test
fn set_env(key: &str, value: &str) {
    unsafe {
        env::set_var(key, value);
    }
}

#[test]
#[serial]
fn test_env_config_defaults_with_secret_only() {
    clear_all_dumpvault_http_env_vars();
    set_env("DUMPVAULT_JWT_SECRET", SECRET);

    let config = HttpRuntimeConfigBuilder::from_env()
        .expect("should load defaults")
        .build()
        .expect("should build valid config");

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(config.required_role, "admin");
    assert_eq!(config.request_timeout_secs, 900);
    assert!(!config.enable_cors);
    assert!(config.enable_openapi);

    clear_all_dumpvault_http_env_vars();
}

#[test]
#[serial]
fn test_env_config_missing_secret_fails_validation() {
    clear_all_dumpvault_http_env_vars();

    let result = HttpRuntimeConfigBuilder::from_env().unwrap().build();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
#[serial]
fn test_env_config_overrides() {
    clear_all_dumpvault_http_env_vars();
    set_env("DUMPVAULT_JWT_SECRET", SECRET);
    set_env("DUMPVAULT_BIND_ADDR", "0.0.0.0:9090");
    set_env("DUMPVAULT_REQUIRED_ROLE", "backup-operator");
    set_env("DUMPVAULT_ENABLE_CORS", "yes");
    set_env("DUMPVAULT_ENABLE_OPENAPI", "off");
    set_env("DUMPVAULT_REQUEST_TIMEOUT_SECS", "120");

    let config = HttpRuntimeConfigBuilder::from_env().unwrap().build().unwrap();

    assert_eq!(config.bind_addr.port(), 9090);
    assert_eq!(config.required_role, "backup-operator");
    assert!(config.enable_cors);
    assert!(!config.enable_openapi);
    assert_eq!(config.request_timeout_secs, 120);

    clear_all_dumpvault_http_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_values() {
    clear_all_dumpvault_http_env_vars();

    set_env("DUMPVAULT_ENABLE_CORS", "maybe");
    let err = HttpRuntimeConfigBuilder::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref key, .. } if key == "DUMPVAULT_ENABLE_CORS"));
    clear_all_dumpvault_http_env_vars();

    set_env("DUMPVAULT_BIND_ADDR", "not-an-address");
    let err = HttpRuntimeConfigBuilder::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref key, .. } if key == "DUMPVAULT_BIND_ADDR"));
    clear_all_dumpvault_http_env_vars();

    set_env("DUMPVAULT_JWT_SECRET", SECRET);
    set_env("DUMPVAULT_REQUEST_TIMEOUT_SECS", "0");
    let result = HttpRuntimeConfigBuilder::from_env().unwrap().build();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));

    clear_all_dumpvault_http_env_vars();
}

/// Helper to clear all HTTP-related DUMPVAULT_* environment variables
fn clear_all_dumpvault_http_env_vars() {
    let vars_to_clear = [
        "DUMPVAULT_BIND_ADDR",
        "DUMPVAULT_JWT_SECRET",
        "DUMPVAULT_REQUIRED_ROLE",
        "DUMPVAULT_ENABLE_CORS",
        "DUMPVAULT_ENABLE_OPENAPI",
        "DUMPVAULT_REQUEST_TIMEOUT_SECS",
    ];

    for var in vars_to_clear {
        unsafe {
            env::remove_var(var);
        }
    }
}
