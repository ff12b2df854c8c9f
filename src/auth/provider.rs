// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider configuration.
//!
//! A [`ProviderConfig`] is immutable once loaded. It describes how tokens from
//! one identity provider are verified (issuer, audience, algorithms, toggles)
//! and how claims are mapped into a [`SecurityContext`](super::SecurityContext).

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::ConfigError;

/// Region assumed for AWS IAM providers without an explicit `region`.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Identity provider flavour.
///
/// Selects the discovery URL construction and claims mapping strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Standards-compliant OIDC issuer
    #[serde(rename = "oidc")]
    Oidc,
    /// Microsoft Entra ID (Azure AD) v2.0
    #[serde(rename = "azure-entraid")]
    AzureEntraId,
    /// AWS IAM / EKS OIDC
    #[serde(rename = "aws-iam")]
    AwsIam,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Oidc => write!(f, "oidc"),
            ProviderKind::AzureEntraId => write!(f, "azure-entraid"),
            ProviderKind::AwsIam => write!(f, "aws-iam"),
        }
    }
}

/// Expected audience: a single value or a set of acceptable values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// All acceptable audience values.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Audience::One(aud) => vec![aud.as_str()],
            Audience::Many(auds) => auds.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Audience::One(value.to_string())
    }
}

/// Claim names used to build a security context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimNames {
    #[serde(default = "default_subject_claim")]
    pub subject_claim: String,
    #[serde(default = "default_email_claim")]
    pub email_claim: String,
    #[serde(default = "default_name_claim")]
    pub name_claim: String,
    #[serde(default = "default_groups_claim")]
    pub groups_claim: String,
    #[serde(default = "default_roles_claim")]
    pub roles_claim: String,
}

impl Default for ClaimNames {
    fn default() -> Self {
        Self {
            subject_claim: default_subject_claim(),
            email_claim: default_email_claim(),
            name_claim: default_name_claim(),
            groups_claim: default_groups_claim(),
            roles_claim: default_roles_claim(),
        }
    }
}

fn default_subject_claim() -> String {
    "sub".to_string()
}

fn default_email_claim() -> String {
    "email".to_string()
}

fn default_name_claim() -> String {
    "name".to_string()
}

fn default_groups_claim() -> String {
    "groups".to_string()
}

fn default_roles_claim() -> String {
    "roles".to_string()
}

fn default_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256]
}

fn default_true() -> bool {
    true
}

/// Configuration for one JWT identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (unique key; filled from the settings map key when empty)
    #[serde(default)]
    pub name: String,

    /// Provider flavour
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    /// Expected `iss` claim and base URL for discovery
    pub issuer: String,

    /// JWKS endpoint; discovered from the metadata document when absent
    #[serde(default)]
    pub jwks_uri: Option<String>,

    /// Acceptable `aud` values
    pub audience: Audience,

    /// Allowed signing algorithms (non-empty)
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,

    /// UserInfo endpoint (informational)
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,

    /// Azure tenant ID
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// AWS region
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default = "default_true")]
    pub verify_exp: bool,
    #[serde(default = "default_true")]
    pub verify_aud: bool,
    #[serde(default = "default_true")]
    pub verify_iss: bool,

    /// Clock skew tolerance for time-based claims, in seconds
    #[serde(default)]
    pub leeway: u64,

    #[serde(flatten)]
    pub claims: ClaimNames,
}

impl ProviderConfig {
    /// Create a provider configuration with default algorithms, toggles and
    /// claim names.
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        issuer: impl Into<String>,
        audience: impl Into<Audience>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            issuer: issuer.into(),
            jwks_uri: None,
            audience: audience.into(),
            algorithms: default_algorithms(),
            userinfo_endpoint: None,
            tenant_id: None,
            region: None,
            verify_exp: true,
            verify_aud: true,
            verify_iss: true,
            leeway: 0,
            claims: ClaimNames::default(),
        }
    }

    /// Set an explicit JWKS endpoint (skips metadata discovery).
    pub fn with_jwks_uri(mut self, jwks_uri: impl Into<String>) -> Self {
        self.jwks_uri = Some(jwks_uri.into());
        self
    }

    /// Set the Azure tenant ID.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the allowed signing algorithms.
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Set the clock skew leeway in seconds.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Set custom claim names.
    pub fn with_claim_names(mut self, claims: ClaimNames) -> Self {
        self.claims = claims;
        self
    }

    /// Issuer without a trailing slash, used as the discovery base.
    pub fn issuer_base(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }

    /// AWS region, falling back to [`DEFAULT_AWS_REGION`].
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_AWS_REGION)
    }

    /// Check the invariants the validator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms(self.name.clone()));
        }
        Url::parse(&self.issuer).map_err(|e| ConfigError::InvalidIssuer {
            provider: self.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "name": "acme-oidc",
            "type": "oidc",
            "issuer": "https://idp.example.com",
            "audience": "orders-api"
        }))
        .unwrap();

        assert_eq!(config.kind, ProviderKind::Oidc);
        assert_eq!(config.algorithms, vec![Algorithm::RS256]);
        assert!(config.verify_exp && config.verify_aud && config.verify_iss);
        assert_eq!(config.leeway, 0);
        assert_eq!(config.claims, ClaimNames::default());
        assert_eq!(config.audience.values(), vec!["orders-api"]);
    }

    #[test]
    fn deserializes_audience_set_and_custom_claims() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "type": "azure-entraid",
            "issuer": "https://login.microsoftonline.com/tenant-1/v2.0",
            "audience": ["api://orders", "orders-client"],
            "algorithms": ["RS256", "RS384"],
            "groups_claim": "wids",
            "leeway": 30
        }))
        .unwrap();

        assert_eq!(config.kind, ProviderKind::AzureEntraId);
        assert_eq!(
            config.audience.values(),
            vec!["api://orders", "orders-client"]
        );
        assert_eq!(config.algorithms, vec![Algorithm::RS256, Algorithm::RS384]);
        assert_eq!(config.claims.groups_claim, "wids");
        assert_eq!(config.claims.subject_claim, "sub");
        assert_eq!(config.leeway, 30);
    }

    #[test]
    fn rejects_unknown_provider_type() {
        let result: Result<ProviderConfig, _> = serde_json::from_value(serde_json::json!({
            "type": "ldap",
            "issuer": "https://idp.example.com",
            "audience": "x"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_empty_algorithms() {
        let config = ProviderConfig::new(
            "p",
            ProviderKind::Oidc,
            "https://idp.example.com",
            "aud",
        )
        .with_algorithms(vec![]);
        assert!(matches!(config.validate(), Err(ConfigError::NoAlgorithms(_))));
    }

    #[test]
    fn validate_rejects_bad_issuer() {
        let config = ProviderConfig::new("p", ProviderKind::Oidc, "not a url", "aud");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn region_defaults_to_us_east_1() {
        let config = ProviderConfig::new(
            "aws",
            ProviderKind::AwsIam,
            "https://oidc.eks.eu-west-1.amazonaws.com/id/ABC",
            "sts.amazonaws.com",
        );
        assert_eq!(config.region(), DEFAULT_AWS_REGION);
        assert_eq!(config.with_region("eu-west-1").region(), "eu-west-1");
    }

    #[test]
    fn issuer_base_trims_trailing_slash() {
        let config = ProviderConfig::new("p", ProviderKind::Oidc, "https://idp.example.com/", "a");
        assert_eq!(config.issuer_base(), "https://idp.example.com");
    }
}
