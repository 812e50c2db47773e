//! # HTTP Authentication
//!
//! Bearer JWT authentication for the `/backups` routes. A token must be
//! signed with the configured secret and carry the configured role in its
//! `roles` claim.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::debug;

use crate::runtime::error::ApiError;

/// Lifetime of tokens issued by [`JwtAuth::issue_token`].
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user identifier)
    pub exp: usize,         // Expiration time
    pub iat: usize,         // Issued at
    pub roles: Vec<String>, // Granted roles
}

impl Claims {
    pub fn new(user_id: impl Into<String>, roles: Vec<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.into(),
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
            roles,
        }
    }
}

/// Authenticated caller, inserted into request extensions by [`require_role`]
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub roles: Vec<String>,
}

/// Token signer and verifier bound to one secret and one required role
#[derive(Clone)]
pub struct JwtAuth {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    required_role: Arc<str>,
}

impl fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuth")
            .field("required_role", &self.required_role)
            .finish_non_exhaustive()
    }
}

impl JwtAuth {
    pub fn new(secret: &str, required_role: impl Into<String>) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            required_role: Arc::from(required_role.into()),
        }
    }

    pub fn required_role(&self) -> &str {
        &self.required_role
    }

    /// Sign a token for `user_id` valid for [`DEFAULT_TOKEN_TTL_HOURS`]
    pub fn issue_token(
        &self,
        user_id: impl Into<String>,
        roles: Vec<String>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_token_with_ttl(user_id, roles, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }

    pub fn issue_token_with_ttl(
        &self,
        user_id: impl Into<String>,
        roles: Vec<String>,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims::new(user_id, roles, ttl);
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Verify signature and expiry, then return the claims
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }

    /// Resolve the `Authorization` header value into an [`AuthContext`]
    pub fn authorize(&self, header: Option<&str>) -> Result<AuthContext, ApiError> {
        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::AuthenticationRequired)?;

        let claims = self.validate(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::InvalidToken
        })?;

        if !claims.roles.iter().any(|role| role == self.required_role()) {
            return Err(ApiError::InsufficientRole(self.required_role.to_string()));
        }

        Ok(AuthContext {
            user_id: claims.sub,
            roles: claims.roles,
        })
    }
}

/// Middleware to require a valid token carrying the configured role
pub async fn require_role(
    State(auth): State<JwtAuth>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| ApiError::AuthenticationRequired))
        .transpose()?;

    let context = auth.authorize(header)?;
    debug!(user = %context.user_id, "Authenticated request");

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
