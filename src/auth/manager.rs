// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-wide registry of domain authenticators.
//!
//! Authenticators are built lazily on first use and cached for the lifetime
//! of the manager, so each domain keeps one discovery cache. Construction
//! depends only on the settings, so a failure is cached too and logged once.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use super::authenticator::DomainAuthenticator;
use super::error::ConfigError;
use super::policy::AuthSettings;
use super::validator::TokenValidator;

/// HTTP client timeout for discovery requests.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the auth settings, the shared HTTP client and the authenticator cache.
pub struct AuthenticationManager {
    settings: AuthSettings,
    client: reqwest::Client,
    /// `None` marks a domain whose authenticator could not be built.
    authenticators: RwLock<HashMap<String, Option<Arc<DomainAuthenticator>>>>,
}

impl std::fmt::Debug for AuthenticationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationManager")
            .field("providers", &self.settings.providers.len())
            .field("domains", &self.settings.domains.len())
            .finish_non_exhaustive()
    }
}

impl AuthenticationManager {
    /// Create a manager with its own HTTP client.
    pub fn new(settings: AuthSettings) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(settings, client))
    }

    /// Create a manager sharing an existing HTTP client.
    pub fn with_client(settings: AuthSettings, client: reqwest::Client) -> Self {
        Self {
            settings,
            client,
            authenticators: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Configured domain names.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.settings.domains.keys().map(String::as_str)
    }

    /// Whether `domain` has a policy with authentication enabled.
    pub fn is_authentication_enabled(&self, domain: &str) -> bool {
        self.settings
            .domains
            .get(domain)
            .is_some_and(|policy| policy.enabled)
    }

    /// Authenticator for `domain`, built on first use.
    ///
    /// Returns `None` when the domain has no enabled policy, or when the
    /// authenticator cannot be built (logged).
    pub fn get_domain_authenticator(&self, domain: &str) -> Option<Arc<DomainAuthenticator>> {
        let policy = self.settings.domains.get(domain).filter(|p| p.enabled)?;

        {
            let cache = self
                .authenticators
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = cache.get(domain) {
                return slot.clone();
            }
        }

        let mut cache = self
            .authenticators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = cache.get(domain) {
            return slot.clone();
        }

        let authenticator = self
            .settings
            .provider_for(domain, policy)
            .and_then(|provider| TokenValidator::from_config(provider.clone(), self.client.clone()))
            .map(|validator| Arc::new(DomainAuthenticator::new(domain, validator, policy.clone())));

        let slot = match authenticator {
            Ok(auth) => {
                tracing::info!(
                    domain = %domain,
                    provider = %auth.validator().config().name,
                    kind = %auth.validator().kind(),
                    "Domain authenticator created"
                );
                Some(auth)
            }
            Err(e) => {
                tracing::error!(domain = %domain, error = %e, "Failed to create domain authenticator");
                None
            }
        };
        cache.insert(domain.to_string(), slot.clone());
        slot
    }
}
