//! # Environment-Based Configuration
//!
//! Settings for the HTTP boundary. Database and backup settings live in
//! [`dumpvault_core::VaultConfigBuilder`].
//!
//! ## Environment Variables
//!
//! - `DUMPVAULT_BIND_ADDR` - Listen address (default: 127.0.0.1:8080)
//! - `DUMPVAULT_JWT_SECRET` - HMAC secret for bearer tokens, at least 32 bytes (required)
//! - `DUMPVAULT_REQUIRED_ROLE` - Role a token must carry to use `/backups` (default: admin)
//! - `DUMPVAULT_ENABLE_CORS` - Enable permissive CORS (default: false)
//! - `DUMPVAULT_ENABLE_OPENAPI` - Serve `/docs` and `/api-docs/openapi.json` (default: true)
//! - `DUMPVAULT_REQUEST_TIMEOUT_SECS` - Request timeout in seconds (default: 900)

use std::{env, fmt, net::SocketAddr};

/// Minimum length of the token signing secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// HTTP runtime settings
#[derive(Clone)]
pub struct HttpRuntimeConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub required_role: String,
    pub enable_cors: bool,
    pub enable_openapi: bool,
    /// Backup and restore run to completion in the background even when the
    /// response is abandoned at this limit.
    pub request_timeout_secs: u64,
}

impl fmt::Debug for HttpRuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRuntimeConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"[REDACTED]")
            .field("required_role", &self.required_role)
            .field("enable_cors", &self.enable_cors)
            .field("enable_openapi", &self.enable_openapi)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Builder for `HttpRuntimeConfig` with environment variable support
#[derive(Debug, Clone)]
pub struct HttpRuntimeConfigBuilder {
    config: HttpRuntimeConfig,
}

impl Default for HttpRuntimeConfigBuilder {
    fn default() -> Self {
        Self {
            config: HttpRuntimeConfig {
                bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
                jwt_secret: String::new(),
                required_role: "admin".to_string(),
                enable_cors: false,
                enable_openapi: true,
                request_timeout_secs: 900,
            },
        }
    }
}

impl HttpRuntimeConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        if let Some(addr) = get_env_parsed::<SocketAddr>("DUMPVAULT_BIND_ADDR")? {
            builder = builder.bind_addr(addr);
        }
        if let Some(secret) = get_env_string("DUMPVAULT_JWT_SECRET") {
            builder = builder.jwt_secret(secret);
        }
        if let Some(role) = get_env_string("DUMPVAULT_REQUIRED_ROLE") {
            builder = builder.required_role(role);
        }
        if let Some(cors) = get_env_bool("DUMPVAULT_ENABLE_CORS")? {
            builder = builder.enable_cors(cors);
        }
        if let Some(openapi) = get_env_bool("DUMPVAULT_ENABLE_OPENAPI")? {
            builder = builder.enable_openapi(openapi);
        }
        if let Some(timeout) = get_env_parsed::<u64>("DUMPVAULT_REQUEST_TIMEOUT_SECS")? {
            builder = builder.request_timeout_secs(timeout);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    #[must_use]
    pub fn required_role(mut self, role: impl Into<String>) -> Self {
        self.config.required_role = role.into();
        self
    }

    /// Enable or disable CORS
    #[must_use]
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Enable or disable `OpenAPI` documentation
    #[must_use]
    pub fn enable_openapi(mut self, enable: bool) -> Self {
        self.config.enable_openapi = enable;
        self
    }

    /// Set request timeout in seconds
    #[must_use]
    pub fn request_timeout_secs(mut self, timeout: u64) -> Self {
        self.config.request_timeout_secs = timeout;
        self
    }

    /// Validate configuration and build `HttpRuntimeConfig`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<HttpRuntimeConfig, ConfigError> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let config = &self.config;

        if config.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::ValidationError(format!(
                "jwt_secret must be at least {} bytes (set DUMPVAULT_JWT_SECRET)",
                MIN_JWT_SECRET_LEN
            )));
        }
        if config.required_role.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "required_role must not be empty".to_string(),
            ));
        }
        if config.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if config.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "request_timeout_secs must be <= {} (1 hour)",
                MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        Ok(())
    }
}

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match get_env_string(key) {
        Some(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("expected a boolean, got '{}'", value),
            }),
        },
        None => Ok(None),
    }
}

fn get_env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match get_env_string(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_secret_is_required() {
        let err = HttpRuntimeConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("jwt_secret")));

        let config = HttpRuntimeConfigBuilder::new()
            .jwt_secret(SECRET)
            .build()
            .unwrap();
        assert_eq!(config.required_role, "admin");
        assert!(!config.enable_cors);
    }

    #[test]
    fn test_timeout_bounds() {
        for timeout in [0, MAX_REQUEST_TIMEOUT_SECS + 1] {
            assert!(
                HttpRuntimeConfigBuilder::new()
                    .jwt_secret(SECRET)
                    .request_timeout_secs(timeout)
                    .build()
                    .is_err()
            );
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = HttpRuntimeConfigBuilder::new()
            .jwt_secret(SECRET)
            .build()
            .unwrap();
        assert!(!format!("{:?}", config).contains(SECRET));
    }
}
