// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification.
//!
//! A [`TokenValidator`] verifies tokens for one provider: it resolves the
//! signing key through its [`DiscoveryCache`], checks signature, expiry,
//! audience and issuer, then maps claims into a [`SecurityContext`] using the
//! provider's [`ProviderStrategy`].
//!
//! ## Strategies
//!
//! | Kind | Discovery | Claims |
//! |------|-----------|--------|
//! | `oidc` | `{issuer}/.well-known/openid-configuration` | configured claim names |
//! | `azure-entraid` | `login.microsoftonline.com/{tenant}/v2.0/...` | `groups`, falling back to `roles` |
//! | `aws-iam` | `{issuer}/.well-known/openid-configuration` | `aws:roles` or the tags `Role` |

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::{Map, Value};
use url::Url;

use super::claims::{string_list, SecurityContext};
use super::discovery::{DiscoveryCache, KeySource, WELL_KNOWN_PATH};
use super::error::{ConfigError, DiscoveryError, ValidationError};
use super::provider::{ProviderConfig, ProviderKind};

/// Azure v2.0 login authority.
const AZURE_AUTHORITY: &str = "https://login.microsoftonline.com";

/// AWS session tags claim.
const AWS_TAGS_CLAIM: &str = "https://aws.amazon.com/tags";

/// AWS role list claim.
const AWS_ROLES_CLAIM: &str = "aws:roles";

/// Provider-specific discovery and claims conventions.
pub trait ProviderStrategy: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// Metadata document URL for this provider.
    fn discovery_url(&self, config: &ProviderConfig) -> Result<String, DiscoveryError> {
        Ok(format!("{}{WELL_KNOWN_PATH}", config.issuer_base()))
    }

    /// Map verified claims into a security context.
    fn extract_context(
        &self,
        config: &ProviderConfig,
        claims: Map<String, Value>,
    ) -> Result<SecurityContext, ValidationError> {
        SecurityContext::from_claims(claims, &config.claims)
    }
}

/// Standards-compliant OIDC provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericOidc;

impl ProviderStrategy for GenericOidc {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Oidc
    }
}

/// Microsoft Entra ID (v2.0 endpoints).
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureEntraId;

impl AzureEntraId {
    /// Tenant from the issuer path segment preceding `v2.0`.
    fn tenant_from_issuer(issuer: &str) -> Option<String> {
        let url = Url::parse(issuer).ok()?;
        let segments: Vec<&str> = url.path_segments()?.collect();
        let idx = segments.iter().position(|s| *s == "v2.0")?;
        idx.checked_sub(1)
            .map(|i| segments[i])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl ProviderStrategy for AzureEntraId {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AzureEntraId
    }

    fn discovery_url(&self, config: &ProviderConfig) -> Result<String, DiscoveryError> {
        let tenant = config
            .tenant_id
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| Self::tenant_from_issuer(&config.issuer))
            .ok_or_else(|| DiscoveryError::MissingTenant(config.issuer.clone()))?;

        Ok(format!("{AZURE_AUTHORITY}/{tenant}/v2.0{WELL_KNOWN_PATH}"))
    }

    fn extract_context(
        &self,
        config: &ProviderConfig,
        claims: Map<String, Value>,
    ) -> Result<SecurityContext, ValidationError> {
        // App roles double as groups when no group claim is emitted.
        let groups = claims
            .get("groups")
            .or_else(|| claims.get("roles"))
            .map(string_list);
        let roles = claims.get("roles").map(string_list);

        let mut context = SecurityContext::from_claims(claims, &config.claims)?;
        if let Some(groups) = groups {
            context = context.with_groups(groups);
        }
        if let Some(roles) = roles {
            context = context.with_roles(roles);
        }
        Ok(context)
    }
}

/// AWS IAM / EKS OIDC.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsIam;

impl ProviderStrategy for AwsIam {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AwsIam
    }

    fn discovery_url(&self, config: &ProviderConfig) -> Result<String, DiscoveryError> {
        tracing::debug!(region = %config.region(), issuer = %config.issuer, "AWS IAM discovery");
        Ok(format!("{}{WELL_KNOWN_PATH}", config.issuer_base()))
    }

    fn extract_context(
        &self,
        config: &ProviderConfig,
        claims: Map<String, Value>,
    ) -> Result<SecurityContext, ValidationError> {
        let roles = match claims.get(AWS_ROLES_CLAIM) {
            Some(roles) => Some(string_list(roles)),
            None => claims
                .get(AWS_TAGS_CLAIM)
                .and_then(Value::as_object)
                .and_then(|tags| tags.get("Role"))
                .and_then(Value::as_str)
                .map(|role| vec![role.to_string()]),
        };

        let context = SecurityContext::from_claims(claims, &config.claims)?;
        Ok(match roles {
            Some(roles) => context.with_roles(roles),
            None => context,
        })
    }
}

fn strategy_for(kind: ProviderKind) -> Box<dyn ProviderStrategy> {
    match kind {
        ProviderKind::Oidc => Box::new(GenericOidc),
        ProviderKind::AzureEntraId => Box::new(AzureEntraId),
        ProviderKind::AwsIam => Box::new(AwsIam),
    }
}

/// Verifies tokens for one provider.
#[derive(Debug)]
pub struct TokenValidator {
    config: ProviderConfig,
    strategy: Box<dyn ProviderStrategy>,
    discovery: DiscoveryCache,
}

impl TokenValidator {
    /// Build a validator for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is unusable: empty
    /// algorithm set, unparsable issuer, or no resolvable discovery URL.
    pub fn from_config(config: ProviderConfig, client: reqwest::Client) -> Result<Self, ConfigError> {
        config.validate()?;

        let strategy = strategy_for(config.kind);
        let source = match &config.jwks_uri {
            Some(uri) if !uri.is_empty() => KeySource::Jwks(uri.clone()),
            _ => KeySource::Metadata(strategy.discovery_url(&config).map_err(|source| {
                ConfigError::Discovery {
                    provider: config.name.clone(),
                    source,
                }
            })?),
        };

        tracing::debug!(
            provider = %config.name,
            kind = %config.kind,
            source = ?source,
            "Token validator created"
        );

        Ok(Self {
            discovery: DiscoveryCache::new(source, client),
            strategy,
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn kind(&self) -> ProviderKind {
        self.strategy.kind()
    }

    pub fn discovery(&self) -> &DiscoveryCache {
        &self.discovery
    }

    /// Verify `token` and extract its security context.
    pub async fn validate_token(&self, token: &str) -> Result<SecurityContext, ValidationError> {
        let header = decode_header(token)?;
        if !self.config.algorithms.contains(&header.alg) {
            return Err(ValidationError::InvalidToken(format!(
                "algorithm {:?} is not allowed",
                header.alg
            )));
        }

        let key = self.discovery.decoding_key(header.kid.as_deref()).await?;
        let data = decode::<Map<String, Value>>(token, &key, &self.validation(header.alg))?;

        self.strategy.extract_context(&self.config, data.claims)
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.config.leeway;
        validation.validate_nbf = true;

        validation.validate_exp = self.config.verify_exp;
        if !self.config.verify_exp {
            validation.required_spec_claims.remove("exp");
        }

        if self.config.verify_aud {
            validation.set_audience(&self.config.audience.values());
        } else {
            validation.validate_aud = false;
        }

        if self.config.verify_iss {
            validation.set_issuer(&[self.config.issuer.as_str()]);
        }

        validation
    }
}
