//! API documentation handlers
//!
//! OpenAPI specification and a Swagger UI page that loads it.

use axum::response::{Html, Json};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::runtime::types::{
    BackupInfo, CreateBackupResponse, ErrorResponse, HealthResponse, ListBackupsResponse,
    MessageResponse, RestoreForm, SkippedTableInfo,
};

/// GET /docs - Swagger UI for interactive API documentation
pub async fn swagger_ui() -> Html<&'static str> {
    Html(
        r#"
<!DOCTYPE html>
<html>
<head>
    <title>dumpvault API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@3.25.0/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@3.25.0/swagger-ui-bundle.js"></script>
    <script>
        SwaggerUIBundle({
            url: '/api-docs/openapi.json',
            dom_id: '#swagger-ui',
            presets: [
                SwaggerUIBundle.presets.apis,
                SwaggerUIBundle.presets.standalone
            ]
        });
    </script>
</body>
</html>
        "#,
    )
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::runtime::handlers::health_check,
        crate::runtime::handlers::list_backups,
        crate::runtime::handlers::create_backup,
        crate::runtime::handlers::download_backup,
        crate::runtime::handlers::delete_backup,
        crate::runtime::handlers::restore_backup
    ),
    components(
        schemas(
            BackupInfo,
            CreateBackupResponse,
            ErrorResponse,
            HealthResponse,
            ListBackupsResponse,
            MessageResponse,
            RestoreForm,
            SkippedTableInfo
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "backups", description = "Backup and restore endpoints"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "dumpvault HTTP API",
        description = "Create, list, download, delete and restore database dumps"
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json - OpenAPI specification endpoint
pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
