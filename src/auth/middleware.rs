// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-domain authentication middleware for Axum.
//!
//! ## Flow
//!
//! 1. Skip paths pass through untouched
//! 2. Domains without enabled authentication pass through
//! 3. Enabled domains without a usable authenticator are rejected with 503
//! 4. The token is read from `Authorization: Bearer`, then the `token` query
//!    parameter
//! 5. No token: 401 when the policy requires one, else pass through
//! 6. The validated [`SecurityContext`] is inserted into request extensions
//!
//! ## Usage
//!
//! ```rust,ignore
//! let routes = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(axum::middleware::from_fn_with_state(
//!         DomainAuthState::new(manager.clone(), "ORDERS"),
//!         domain_auth,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::claims::SecurityContext;
use super::error::AuthError;
use super::manager::AuthenticationManager;

/// Paths that never require authentication (prefix match).
pub const SKIP_PATHS: &[&str] = &["/healthz", "/readyz", "/docs", "/openapi.json", "/redoc"];

/// Query parameter accepted as a token fallback.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Middleware state: the shared manager and the domain this router serves.
#[derive(Debug, Clone)]
pub struct DomainAuthState {
    pub manager: Arc<AuthenticationManager>,
    pub domain: Arc<str>,
}

impl DomainAuthState {
    pub fn new(manager: Arc<AuthenticationManager>, domain: impl AsRef<str>) -> Self {
        Self {
            manager,
            domain: Arc::from(domain.as_ref()),
        }
    }
}

fn is_skip_path(path: &str) -> bool {
    SKIP_PATHS.iter().any(|skip| path.starts_with(skip))
}

/// Bearer token from the header, falling back to the query string.
fn extract_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// Authenticate requests for one domain.
pub async fn domain_auth(
    State(state): State<DomainAuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let domain = state.domain.as_ref();

    if is_skip_path(request.uri().path()) || !state.manager.is_authentication_enabled(domain) {
        return next.run(request).await;
    }

    let Some(authenticator) = state.manager.get_domain_authenticator(domain) else {
        tracing::error!(domain = %domain, "Authentication enabled but no authenticator available");
        return AuthError::Unavailable(domain.to_string()).into_response();
    };

    let Some(token) = extract_token(&request) else {
        if authenticator.policy().required {
            tracing::debug!(domain = %domain, "Missing bearer token");
            return AuthError::MissingToken.into_response();
        }
        return next.run(request).await;
    };

    match authenticator.authenticate_request(&token).await {
        Ok(context) => {
            request.extensions_mut().insert::<SecurityContext>(context);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
