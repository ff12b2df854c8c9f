// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{domain_auth, Auth, AuthenticationManager, DomainAuthState, DomainPolicy};
use crate::error::ApiError;
use crate::state::AppState;

/// Top-level path segments a domain cannot be mounted at.
const RESERVED_SEGMENTS: &[&str] = &["healthz", "readyz", "domains", "docs", "api-doc", "redoc"];

/// Mount path for a domain (`ORDERS` → `/orders`).
///
/// `None` when the lowercased name is reserved or not a plain path segment.
pub fn mount_path(domain: &str) -> Option<String> {
    let segment = domain.to_lowercase();
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid || RESERVED_SEGMENTS.contains(&segment.as_str()) {
        return None;
    }
    Some(format!("/{segment}"))
}

/// Routes served under one domain, behind that domain's auth middleware.
pub fn domain_router(manager: Arc<AuthenticationManager>, domain: &str) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .layer(middleware::from_fn_with_state(
            DomainAuthState::new(manager, domain),
            domain_auth,
        ))
}

/// Identity of the authenticated caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct WhoAmIResponse {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub groups: Vec<String>,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Authentication settings of one domain.
#[derive(Debug, Serialize, ToSchema)]
pub struct DomainSummary {
    pub name: String,
    pub enabled: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub require_groups: Vec<String>,
    pub require_roles: Vec<String>,
    /// Path the domain's routes are mounted at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
}

impl DomainSummary {
    fn new(name: &str, policy: &DomainPolicy) -> Self {
        Self {
            name: name.to_string(),
            enabled: policy.enabled,
            required: policy.required,
            provider: policy.provider.clone(),
            require_groups: policy.require_groups.clone(),
            require_roles: policy.require_roles.clone(),
            mount: mount_path(name),
        }
    }
}

/// Return the caller's security context.
#[utoipa::path(
    get,
    path = "/{domain}/whoami",
    tag = "Domains",
    params(
        ("domain" = String, Path, description = "Lowercased domain name")
    ),
    responses(
        (status = 200, description = "Authenticated identity", body = WhoAmIResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Domain policy not satisfied"),
        (status = 503, description = "Domain authentication unavailable")
    ),
    security(("bearer" = []))
)]
pub async fn whoami(Auth(ctx): Auth) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        subject: ctx.subject().to_string(),
        email: ctx.email().map(str::to_string),
        name: ctx.name().map(str::to_string),
        groups: ctx.groups().to_vec(),
        roles: ctx.roles().to_vec(),
        issuer: ctx.issuer().map(str::to_string),
        expires_at: ctx.expires_at_utc(),
    })
}

/// List configured domains.
#[utoipa::path(
    get,
    path = "/domains",
    tag = "Domains",
    responses(
        (status = 200, description = "Configured domains", body = [DomainSummary])
    )
)]
pub async fn list_domains(State(state): State<AppState>) -> Json<Vec<DomainSummary>> {
    let settings = state.auth.settings();
    let mut domains: Vec<DomainSummary> = settings
        .domains
        .iter()
        .map(|(name, policy)| DomainSummary::new(name, policy))
        .collect();
    domains.sort_by(|a, b| a.name.cmp(&b.name));
    Json(domains)
}

/// Get one domain's authentication settings.
#[utoipa::path(
    get,
    path = "/domains/{name}",
    tag = "Domains",
    params(
        ("name" = String, Path, description = "Domain name as configured")
    ),
    responses(
        (status = 200, description = "Domain settings", body = DomainSummary),
        (status = 404, description = "Unknown domain")
    )
)]
pub async fn get_domain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DomainSummary>, ApiError> {
    state
        .auth
        .settings()
        .domains
        .get(&name)
        .map(|policy| Json(DomainSummary::new(&name, policy)))
        .ok_or(ApiError::UnknownDomain(name))
}
