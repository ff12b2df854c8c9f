// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-domain authentication policy and the full auth settings.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::claims::SecurityContext;
use super::error::{AuthorizationError, ConfigError};
use super::provider::ProviderConfig;

fn default_true() -> bool {
    true
}

/// Authentication requirements for one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainPolicy {
    /// Enable authentication for this domain
    #[serde(default)]
    pub enabled: bool,

    /// Whether a token must be presented (when enabled)
    #[serde(default = "default_true")]
    pub required: bool,

    /// Provider name
    #[serde(default)]
    pub provider: Option<String>,

    /// At least one of these groups is required (when non-empty)
    #[serde(default)]
    pub require_groups: Vec<String>,

    /// At least one of these roles is required (when non-empty)
    #[serde(default)]
    pub require_roles: Vec<String>,

    /// Claims that must be present with exactly these values
    #[serde(default)]
    pub required_claims: BTreeMap<String, Value>,
}

impl DomainPolicy {
    /// Enabled, token-required policy bound to `provider`.
    pub fn enabled_with(provider: impl Into<String>) -> Self {
        Self {
            enabled: true,
            required: true,
            provider: Some(provider.into()),
            ..Self::default()
        }
    }

    /// Disabled policy.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            required: true,
            ..Self::default()
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.required_claims.insert(name.into(), value);
        self
    }

    /// Evaluate the group, role and claim requirements against a validated
    /// security context.
    pub fn authorize(&self, context: &SecurityContext) -> Result<(), AuthorizationError> {
        if !self.require_groups.is_empty() && !context.has_any_group(&self.require_groups) {
            return Err(AuthorizationError::MissingGroup(self.require_groups.clone()));
        }

        if !self.require_roles.is_empty() && !context.has_any_role(&self.require_roles) {
            return Err(AuthorizationError::MissingRole(self.require_roles.clone()));
        }

        for (name, expected) in &self.required_claims {
            if context.claim(name) != Some(expected) {
                return Err(AuthorizationError::ClaimMismatch(name.clone()));
            }
        }

        Ok(())
    }
}

/// Providers and per-domain policies, as produced by the config loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub domains: HashMap<String, DomainPolicy>,
}

impl AuthSettings {
    /// Add a provider, keyed by its name.
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.insert(provider.name.clone(), provider);
        self
    }

    /// Add a domain policy.
    pub fn with_domain(mut self, domain: impl Into<String>, policy: DomainPolicy) -> Self {
        self.domains.insert(domain.into(), policy);
        self
    }

    /// Fill empty provider names from their map keys.
    pub fn normalize(mut self) -> Self {
        for (key, provider) in self.providers.iter_mut() {
            if provider.name.is_empty() {
                provider.name = key.clone();
            }
        }
        self
    }

    /// Resolve the provider an enabled domain policy points at.
    pub fn provider_for(
        &self,
        domain: &str,
        policy: &DomainPolicy,
    ) -> Result<&ProviderConfig, ConfigError> {
        let name = policy
            .provider
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::MissingProvider(domain.to_string()))?;

        self.providers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProvider {
                domain: domain.to_string(),
                provider: name.to_string(),
            })
    }

    /// Check every provider, and every enabled domain's provider reference.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for provider in self.providers.values() {
            provider.validate()?;
        }

        for (domain, policy) in &self.domains {
            if policy.enabled {
                self.provider_for(domain, policy)?;
            }
        }

        Ok(())
    }
}
