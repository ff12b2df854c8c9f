// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors for the non-authenticating API handlers.
//!
//! Bodies use the same `{error, error_code}` shape as
//! [`AuthError`](crate::auth::AuthError) responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No policy is configured under this domain name
    #[error("Domain {0} is not configured")]
    UnknownDomain(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::UnknownDomain(_) => "unknown_domain",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownDomain(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
            error_code: self.error_code(),
        });
        (self.status_code(), body).into_response()
    }
}
