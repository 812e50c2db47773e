//! # Runtime Module
//!
//! HTTP boundary for [`BackupService`]: bearer-token authorization, JSON
//! responses, multipart restore uploads and OpenAPI documentation.
//!
//! ```no_run
//! use dumpvault_core::VaultConfigBuilder;
//! use dumpvault_http::runtime::{HttpBackupRuntime, HttpRuntimeConfigBuilder, serve};
//! # use std::sync::Arc;
//! # async fn run(loader: Arc<dyn dumpvault_core::DumpLoader>) -> Result<(), Box<dyn std::error::Error>> {
//! let vault = VaultConfigBuilder::from_env()?.build()?;
//! let http = HttpRuntimeConfigBuilder::from_env()?.build()?;
//! let service = dumpvault_core::BackupService::new(vault, loader);
//! serve(HttpBackupRuntime::new(service), http).await?;
//! # Ok(())
//! # }
//! ```

/// Bearer token authentication middleware.
pub mod auth;
/// Environment-based HTTP configuration.
pub mod config;
/// API documentation endpoints.
pub mod docs;
/// Error to response mapping.
pub mod error;
/// HTTP request handlers organized by functionality.
pub mod handlers;
/// HTTP router configuration and route registration.
pub mod router;
/// Graceful shutdown handling.
pub mod shutdown;
/// Request and response types.
pub mod types;

use std::{io, time::Instant};

use dumpvault_core::BackupService;
use tokio::net::TcpListener;
use tracing::info;

pub use auth::{AuthContext, Claims, JwtAuth};
pub use config::{ConfigError, HttpRuntimeConfig, HttpRuntimeConfigBuilder};
pub use error::ApiError;
pub use shutdown::shutdown_signal;

/// Shared handler state
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: BackupService,
    pub auth: JwtAuth,
    pub started_at: Instant,
}

/// HTTP runtime serving one [`BackupService`]
#[derive(Clone, Debug)]
pub struct HttpBackupRuntime {
    service: BackupService,
}

impl HttpBackupRuntime {
    pub fn new(service: BackupService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &BackupService {
        &self.service
    }

    fn into_state(self, config: &HttpRuntimeConfig) -> AppState {
        AppState {
            service: self.service,
            auth: JwtAuth::new(&config.jwt_secret, config.required_role.clone()),
            started_at: Instant::now(),
        }
    }
}

/// Bind `config.bind_addr` and serve until SIGINT or SIGTERM
pub async fn serve(runtime: HttpBackupRuntime, config: HttpRuntimeConfig) -> io::Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        database = %runtime.service().config().database.display_name(),
        backups_dir = %runtime.service().config().backups_dir.display(),
        "dumpvault HTTP runtime listening"
    );

    let app = runtime.router_with_config(&config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
