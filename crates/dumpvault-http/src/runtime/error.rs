//! Error to HTTP response mapping
//!
//! Every failure is rendered as [`ErrorResponse`] with a status derived from
//! the error kind:
//!
//! | Kind                                   | Status |
//! |----------------------------------------|--------|
//! | `FileNotFound`                         | 404    |
//! | `Busy`, `AlreadyExists`                | 409    |
//! | `ValidationFailure`                    | 422    |
//! | `ConnectionFailure`, process, query    | 502    |
//! | `Timeout`                              | 504    |
//! | driver, binary, I/O                    | 500    |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dumpvault_core::BackupError;
use tracing::{error, warn};

use crate::runtime::types::ErrorResponse;

/// Errors returned by handlers and middleware
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("Authentication is required. Use the Authorization header with a Bearer token")]
    AuthenticationRequired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Role '{0}' is required")]
    InsufficientRole(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Backup(e) => match e {
                BackupError::FileNotFound(_) => StatusCode::NOT_FOUND,
                BackupError::Busy(_) | BackupError::AlreadyExists(_) => StatusCode::CONFLICT,
                BackupError::ValidationFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BackupError::ConnectionFailure(_)
                | BackupError::ExternalProcessFailure { .. }
                | BackupError::Query(_) => StatusCode::BAD_GATEWAY,
                BackupError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                BackupError::UnsupportedDriver(_)
                | BackupError::BinaryNotFound { .. }
                | BackupError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::AuthenticationRequired | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientRole(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code placed in the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Backup(e) => e.code(),
            ApiError::AuthenticationRequired => "authentication_required",
            ApiError::InvalidToken => "invalid_token",
            ApiError::InsufficientRole(_) => "insufficient_role",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = self.code(), %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = self.code(), %message, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
                error: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BackupError::FileNotFound("x.sql".into()), StatusCode::NOT_FOUND),
            (BackupError::Busy("db".into()), StatusCode::CONFLICT),
            (BackupError::AlreadyExists("x.sql".into()), StatusCode::CONFLICT),
            (
                BackupError::ValidationFailure("too big".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                BackupError::ConnectionFailure("refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BackupError::ExternalProcessFailure {
                    program: "mysql".into(),
                    exit_code: Some(1),
                    stderr: "denied".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                BackupError::Timeout {
                    program: "mysql".into(),
                    limit: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                BackupError::BinaryNotFound {
                    name: "sqlite3".into(),
                    reason: "not on PATH".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InsufficientRole("admin".into()).status(),
            StatusCode::FORBIDDEN
        );
    }
}
