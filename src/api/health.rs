// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Readiness response with per-domain status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Individual checks and their results.
    pub checks: HealthChecks,
}

/// Individual readiness check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Status of each domain with authentication enabled.
    pub domains: BTreeMap<String, DomainCheck>,
}

/// Readiness of one authenticated domain.
#[derive(Debug, Serialize, ToSchema)]
pub struct DomainCheck {
    /// "ok" when the domain authenticator could be built, else "unavailable".
    pub authenticator: String,
    /// Identity provider key discovery ("ok" or "unavailable").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Check one enabled domain: the authenticator must be constructible.
///
/// Discovery is attempted when nothing is cached yet. Its result is reported
/// but does not affect readiness.
async fn check_domain(state: &AppState, domain: &str) -> DomainCheck {
    let Some(authenticator) = state.auth.get_domain_authenticator(domain) else {
        return DomainCheck {
            authenticator: "unavailable".to_string(),
            discovery: None,
        };
    };

    let discovery = authenticator.validator().discovery();
    let discovery_status = if discovery.is_cached().await {
        "ok"
    } else {
        match discovery.refresh().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "Readiness discovery check failed");
                "unavailable"
            }
        }
    };

    DomainCheck {
        authenticator: "ok".to_string(),
        discovery: Some(discovery_status.to_string()),
    }
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if every domain with authentication enabled has a
/// usable authenticator.
#[utoipa::path(
    get,
    path = "/readyz",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let mut enabled: Vec<String> = state
        .auth
        .domains()
        .filter(|d| state.auth.is_authentication_enabled(d))
        .map(str::to_string)
        .collect();
    enabled.sort_unstable();

    let mut domains = BTreeMap::new();
    for domain in enabled {
        let check = check_domain(&state, &domain).await;
        domains.insert(domain, check);
    }

    let all_ok = domains.values().all(|c| c.authenticator == "ok");
    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            domains,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::TestIdp;
    use crate::auth::{AuthSettings, AuthenticationManager, DomainPolicy, ProviderConfig, ProviderKind};

    #[tokio::test]
    async fn liveness_is_ok() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn readiness_without_domains_is_ok() {
        let (status, Json(body)) = readiness(State(AppState::default())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.checks.domains.is_empty());
    }

    #[tokio::test]
    async fn readiness_reports_domains() {
        let idp = TestIdp::start().await;
        let settings = AuthSettings::default()
            .with_provider(idp.provider("acme-oidc"))
            .with_domain("ORDERS", DomainPolicy::enabled_with("acme-oidc"))
            .with_domain("PUBLIC", DomainPolicy::disabled());
        let state = AppState::new(AuthenticationManager::new(settings).unwrap());

        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.checks.domains.len(), 1);
        assert_eq!(body.checks.domains["ORDERS"].discovery.as_deref(), Some("ok"));
        assert_eq!(idp.discovery_hits(), 1);
    }

    #[tokio::test]
    async fn readiness_degrades_on_broken_domain() {
        let settings = AuthSettings::default()
            .with_provider(
                ProviderConfig::new("broken", ProviderKind::Oidc, "https://idp.example.com", "a")
                    .with_algorithms(vec![]),
            )
            .with_domain("BROKEN", DomainPolicy::enabled_with("broken"));
        let state = AppState::new(AuthenticationManager::new(settings).unwrap());

        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.domains["BROKEN"].authenticator, "unavailable");
    }
}
