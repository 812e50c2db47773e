//! HTTP router configuration
//!
//! Route registration and middleware for the HTTP runtime.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::runtime::{
    AppState, HttpBackupRuntime, HttpRuntimeConfig,
    auth::require_role,
    docs::{openapi_spec, swagger_ui},
    handlers::{
        create_backup, delete_backup, download_backup, health_check, list_backups,
        restore_backup,
    },
};

/// Headroom above the upload limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

impl HttpBackupRuntime {
    /// Create the Axum router with all endpoints and middleware
    pub fn router_with_config(self, config: &HttpRuntimeConfig) -> Router {
        let state = self.into_state(config);
        let body_limit = restore_body_limit(state.service.config().max_upload_bytes);

        // Protected routes - require a token with the configured role
        let protected_routes = Router::new()
            .route("/backups", get(list_backups).post(create_backup))
            .route(
                "/backups/restore",
                post(restore_backup).layer(DefaultBodyLimit::max(body_limit)),
            )
            .route(
                "/backups/{filename}",
                get(download_backup).delete(delete_backup),
            )
            .route_layer(middleware::from_fn_with_state(
                state.auth.clone(),
                require_role,
            ));

        // Public routes - no authentication required
        let public_routes = Router::new().route("/health", get(health_check));

        let mut router = Router::new()
            .merge(public_routes)
            .merge(protected_routes)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http());

        // Add CORS if enabled
        if config.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        // Add OpenAPI documentation if enabled
        if config.enable_openapi {
            router = router.merge(create_openapi_router());
        }

        router
    }
}

fn restore_body_limit(max_upload_bytes: u64) -> usize {
    usize::try_from(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
        .unwrap_or(usize::MAX)
}

/// Create OpenAPI documentation router
fn create_openapi_router() -> Router {
    Router::new()
        .route("/docs", get(swagger_ui))
        .route("/api-docs/openapi.json", get(openapi_spec))
}
