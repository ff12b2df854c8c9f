// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Security context extracted from a validated token.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::ValidationError;
use super::provider::ClaimNames;

/// Validated identity and authorization snapshot for one request.
///
/// Built only from a verified token payload and never mutated afterwards;
/// handlers read it through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityContext {
    subject: String,
    email: Option<String>,
    name: Option<String>,
    groups: Vec<String>,
    roles: Vec<String>,
    issuer: Option<String>,
    audience: Vec<String>,
    expires_at: Option<i64>,
    issued_at: Option<i64>,
    #[serde(skip)]
    claims: Map<String, Value>,
}

impl SecurityContext {
    /// Start building a context for `subject`.
    pub fn builder(subject: impl Into<String>) -> SecurityContextBuilder {
        SecurityContextBuilder::new(subject)
    }

    /// Build a context by reading the configured claim names from a verified
    /// payload.
    ///
    /// Groups and roles default to empty when the claim is absent; a single
    /// string is accepted as a one-element list.
    pub fn from_claims(claims: Map<String, Value>, names: &ClaimNames) -> Result<Self, ValidationError> {
        let subject = claims
            .get(&names.subject_claim)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ValidationError::InvalidToken(format!(
                    "missing subject claim '{}'",
                    names.subject_claim
                ))
            })?
            .to_string();

        let groups = claims.get(&names.groups_claim).map(string_list).unwrap_or_default();
        let roles = claims.get(&names.roles_claim).map(string_list).unwrap_or_default();

        Ok(Self {
            subject,
            email: string_claim(&claims, &names.email_claim),
            name: string_claim(&claims, &names.name_claim),
            groups,
            roles,
            issuer: string_claim(&claims, "iss"),
            audience: claims.get("aud").map(string_list).unwrap_or_default(),
            expires_at: claims.get("exp").and_then(Value::as_i64),
            issued_at: claims.get("iat").and_then(Value::as_i64),
            claims,
        })
    }

    pub(crate) fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    pub(crate) fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Canonical user identifier.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    /// Token expiry (Unix seconds).
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Token issue time (Unix seconds).
    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    /// Token expiry as a UTC timestamp.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    /// Full decoded payload.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Single raw claim.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_group<S: AsRef<str>>(&self, groups: &[S]) -> bool {
        groups.iter().any(|g| self.has_group(g.as_ref()))
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }
}

/// Builder for [`SecurityContext`], mainly for tests and extractors fed by
/// other authentication layers.
#[derive(Debug, Clone)]
pub struct SecurityContextBuilder {
    inner: SecurityContext,
}

impl SecurityContextBuilder {
    fn new(subject: impl Into<String>) -> Self {
        Self {
            inner: SecurityContext {
                subject: subject.into(),
                email: None,
                name: None,
                groups: Vec::new(),
                roles: Vec::new(),
                issuer: None,
                audience: Vec::new(),
                expires_at: None,
                issued_at: None,
                claims: Map::new(),
            },
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.inner.email = Some(email.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = Some(name.into());
        self
    }

    pub fn groups(mut self, groups: Vec<String>) -> Self {
        self.inner.groups = groups;
        self
    }

    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.inner.roles = roles;
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.inner.issuer = Some(issuer.into());
        self
    }

    pub fn expires_at(mut self, expires_at: i64) -> Self {
        self.inner.expires_at = Some(expires_at);
        self
    }

    pub fn claims(mut self, claims: Map<String, Value>) -> Self {
        self.inner.claims = claims;
        self
    }

    pub fn build(self) -> SecurityContext {
        self.inner
    }
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Read a claim that may be a string or an array of strings.
pub(crate) fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
