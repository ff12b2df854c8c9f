// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod domains;
pub mod health;

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/healthz", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .route("/domains", get(domains::list_domains))
        .route("/domains/{name}", get(domains::get_domain))
        .with_state(state.clone());

    let mut names: Vec<&str> = state.auth.domains().collect();
    names.sort_unstable();
    for domain in names {
        match domains::mount_path(domain) {
            Some(path) => {
                tracing::debug!(domain = %domain, path = %path, "Mounting domain routes");
                app = app.nest(&path, domains::domain_router(state.auth.clone(), domain));
            }
            None => {
                tracing::warn!(domain = %domain, "Domain name cannot be used as a path, routes not mounted");
            }
        }
    }

    app.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
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
        health::liveness,
        health::readiness,
        domains::list_domains,
        domains::get_domain,
        domains::whoami
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::DomainCheck,
            domains::DomainSummary,
            domains::WhoAmIResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Domains", description = "Per-domain authentication")
    )
)]
struct ApiDoc;
