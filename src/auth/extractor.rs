// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the security context.
//!
//! The [`domain_auth`](super::middleware::domain_auth) middleware stores the
//! validated context in request extensions; these extractors read it back:
//!
//! ```rust,ignore
//! async fn whoami(Auth(ctx): Auth) -> impl IntoResponse {
//!     ctx.subject().to_string()
//! }
//! ```
//!
//! Route-level membership checks use [`RequireGroups`] / [`RequireRoles`]
//! with a [`Requirement`] naming the accepted values:
//!
//! ```rust,ignore
//! struct Operators;
//!
//! impl Requirement for Operators {
//!     const NAMES: &'static [&'static str] = &["ops", "admin"];
//! }
//!
//! async fn purge(RequireGroups(ctx, _): RequireGroups<Operators>) -> impl IntoResponse {
//!     // caller is in "ops" or "admin"
//! }
//! ```

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthorizationError, SecurityContext};

/// Extractor that requires an authenticated request.
///
/// Rejects with 401 when no context was attached, e.g. on a domain with
/// authentication disabled or not required.
pub struct Auth(pub SecurityContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingToken)
    }
}

/// Accepted group or role names for [`RequireGroups`] / [`RequireRoles`].
pub trait Requirement: Send + Sync + 'static {
    /// Access is granted when the caller holds any of these.
    const NAMES: &'static [&'static str];
}

fn names<R: Requirement>() -> Vec<String> {
    R::NAMES.iter().map(|n| n.to_string()).collect()
}

/// Extractor that requires membership in one of `R::NAMES` groups.
///
/// Rejects with 401 when unauthenticated, 403 when no group matches.
pub struct RequireGroups<R: Requirement>(pub SecurityContext, pub PhantomData<R>);

impl<S, R> FromRequestParts<S> for RequireGroups<R>
where
    S: Send + Sync,
    R: Requirement,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(ctx) = Auth::from_request_parts(parts, state).await?;

        if !ctx.has_any_group(R::NAMES) {
            return Err(AuthorizationError::MissingGroup(names::<R>()).into());
        }

        Ok(RequireGroups(ctx, PhantomData))
    }
}

/// Extractor that requires one of `R::NAMES` roles.
///
/// Rejects with 401 when unauthenticated, 403 when no role matches.
pub struct RequireRoles<R: Requirement>(pub SecurityContext, pub PhantomData<R>);

impl<S, R> FromRequestParts<S> for RequireRoles<R>
where
    S: Send + Sync,
    R: Requirement,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(ctx) = Auth::from_request_parts(parts, state).await?;

        if !ctx.has_any_role(R::NAMES) {
            return Err(AuthorizationError::MissingRole(names::<R>()).into());
        }

        Ok(RequireRoles(ctx, PhantomData))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` for anonymous requests instead of rejecting.
pub struct OptionalAuth(pub Option<SecurityContext>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<SecurityContext>().cloned()))
    }
}
