// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! ## Taxonomy
//!
//! | Error | Raised by | HTTP |
//! |-------|-----------|------|
//! | [`ConfigError`] | settings loading, validator factory | startup failure, or 503 via the manager |
//! | [`DiscoveryError`] | metadata / JWKS fetch | wrapped in [`ValidationError`] |
//! | [`ValidationError`] | token decode and verification | 401 |
//! | [`AuthorizationError`] | domain policy evaluation | 403 |
//! | [`AuthError`] | middleware and extractors | mapped per variant |

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Invalid or unresolvable provider/domain configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("domain '{0}' has authentication enabled but no provider")]
    MissingProvider(String),

    #[error("domain '{domain}' references unknown provider '{provider}'")]
    UnknownProvider { domain: String, provider: String },

    #[error("provider '{0}' has no signing algorithms configured")]
    NoAlgorithms(String),

    #[error("provider '{provider}' has an invalid issuer URL: {reason}")]
    InvalidIssuer { provider: String, reason: String },

    #[error("provider '{provider}' has no usable discovery endpoint: {source}")]
    Discovery {
        provider: String,
        #[source]
        source: DiscoveryError,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("failed to read auth config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse auth config {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("unsupported auth config format: {0} (expected .json or .toml)")]
    UnsupportedFormat(String),
}

/// Metadata or key-set discovery failure.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid document from {url}: {reason}")]
    InvalidDocument { url: String, reason: String },

    #[error("discovery document from {0} has no jwks_uri")]
    MissingJwksUri(String),

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("Azure tenant ID not configured and not found in issuer {0}")]
    MissingTenant(String),

    #[error("no matching key in JWKS")]
    NoMatchingKey,

    #[error("unsupported key in JWKS: {0}")]
    UnsupportedKey(String),
}

/// Token rejected during decoding or verification.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token audience is invalid")]
    AudienceMismatch,

    #[error("token issuer is invalid")]
    IssuerMismatch,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

impl ValidationError {
    /// Stable, machine-readable failure reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::Expired => "expired",
            ValidationError::InvalidSignature => "invalid-signature",
            ValidationError::AudienceMismatch => "audience-mismatch",
            ValidationError::IssuerMismatch => "issuer-mismatch",
            ValidationError::InvalidToken(_) => "invalid-token",
            ValidationError::Discovery(_) => "discovery-failed",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => ValidationError::Expired,
            ErrorKind::InvalidSignature => ValidationError::InvalidSignature,
            ErrorKind::InvalidAudience => ValidationError::AudienceMismatch,
            ErrorKind::InvalidIssuer => ValidationError::IssuerMismatch,
            ErrorKind::ImmatureSignature => {
                ValidationError::InvalidToken("token is not yet valid".to_string())
            }
            _ => ValidationError::InvalidToken(err.to_string()),
        }
    }
}

/// Token is valid but the domain policy denies access.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("requires one of groups: {}", .0.join(", "))]
    MissingGroup(Vec<String>),

    #[error("requires one of roles: {}", .0.join(", "))]
    MissingRole(Vec<String>),

    #[error("claim '{0}' does not have the required value")]
    ClaimMismatch(String),
}

/// Authentication error surfaced at the HTTP edge.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No bearer token on a domain that requires one
    #[error("Authentication required")]
    MissingToken,
    /// Token failed validation
    #[error("Token validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Token valid, policy not satisfied
    #[error("Access denied: {0}")]
    Authorization(#[from] AuthorizationError),
    /// Domain has authentication enabled but no usable authenticator
    #[error("Authentication unavailable for domain {0}")]
    Unavailable(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::Validation(ValidationError::Expired) => "token_expired",
            AuthError::Validation(ValidationError::InvalidSignature) => "invalid_signature",
            AuthError::Validation(ValidationError::AudienceMismatch) => "invalid_audience",
            AuthError::Validation(ValidationError::IssuerMismatch) => "invalid_issuer",
            AuthError::Validation(ValidationError::InvalidToken(_)) => "invalid_token",
            AuthError::Validation(ValidationError::Discovery(_)) => "discovery_failed",
            AuthError::Authorization(_) => "insufficient_permissions",
            AuthError::Unavailable(_) => "authentication_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::Validation(_) => StatusCode::UNAUTHORIZED,
            AuthError::Authorization(_) => StatusCode::FORBIDDEN,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// `WWW-Authenticate` challenge for 401 responses (RFC 6750).
    fn challenge(&self) -> Option<HeaderValue> {
        match self {
            AuthError::MissingToken => Some(HeaderValue::from_static("Bearer")),
            AuthError::Validation(_) => Some(HeaderValue::from_static(
                "Bearer error=\"invalid_token\"",
            )),
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let challenge = self.challenge();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });

        let mut response = (status, body).into_response();
        if let Some(value) = challenge {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}
