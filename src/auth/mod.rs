// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Per-domain bearer token authentication against external identity
//! providers (generic OIDC, Azure EntraID, AWS IAM).
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <JWT>` (or `?token=<JWT>`)
//! 2. The domain's middleware asks the [`AuthenticationManager`] for the
//!    domain's [`DomainAuthenticator`]
//! 3. The authenticator's [`TokenValidator`]:
//!    - Fetches provider metadata and JWKS (cached for one hour)
//!    - Verifies signature, expiry, not-before, issuer, audience
//!    - Maps claims into a [`SecurityContext`]
//! 4. The [`DomainPolicy`] checks required groups, roles and claims
//!
//! ## Security
//!
//! - Enabled domains without a usable authenticator fail closed (503)
//! - Token contents are never logged
//! - Only algorithms listed in the provider configuration are accepted

pub mod authenticator;
pub mod claims;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod manager;
pub mod middleware;
pub mod policy;
pub mod provider;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use authenticator::DomainAuthenticator;
pub use claims::SecurityContext;
pub use error::{AuthError, AuthorizationError, ConfigError, DiscoveryError, ValidationError};
pub use extractor::{Auth, OptionalAuth, RequireGroups, RequireRoles, Requirement};
pub use manager::AuthenticationManager;
pub use middleware::{domain_auth, DomainAuthState};
pub use policy::{AuthSettings, DomainPolicy};
pub use provider::{Audience, ClaimNames, ProviderConfig, ProviderKind};
pub use validator::TokenValidator;
