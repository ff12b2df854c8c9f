// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Validate-and-authorize for a single domain.

use super::claims::SecurityContext;
use super::error::AuthError;
use super::policy::DomainPolicy;
use super::validator::TokenValidator;

/// One token validator bound to one domain policy.
#[derive(Debug)]
pub struct DomainAuthenticator {
    domain: String,
    validator: TokenValidator,
    policy: DomainPolicy,
}

impl DomainAuthenticator {
    pub fn new(domain: impl Into<String>, validator: TokenValidator, policy: DomainPolicy) -> Self {
        Self {
            domain: domain.into(),
            validator,
            policy,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Validate `token` and check it against the domain policy.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] if the token is not acceptable
    /// - [`AuthError::Authorization`] if the policy is not satisfied
    pub async fn authenticate_request(&self, token: &str) -> Result<SecurityContext, AuthError> {
        let context = self.validator.validate_token(token).await.map_err(|e| {
            tracing::warn!(
                domain = %self.domain,
                provider = %self.validator.config().name,
                reason = e.reason(),
                error = %e,
                "Token validation failed"
            );
            e
        })?;

        self.policy.authorize(&context).map_err(|e| {
            tracing::warn!(
                domain = %self.domain,
                subject = %context.subject(),
                error = %e,
                "Authorization denied"
            );
            e
        })?;

        tracing::debug!(domain = %self.domain, subject = %context.subject(), "Request authenticated");
        Ok(context)
    }
}
