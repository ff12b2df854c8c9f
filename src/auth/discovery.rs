// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OIDC metadata and JWKS fetching with caching.
//!
//! ## Behaviour
//!
//! - Metadata and key set are cached together for [`DEFAULT_REFRESH_INTERVAL`]
//! - A stale entry is refreshed on the next lookup; refreshes are single-flight
//! - An unknown `kid` triggers a key set refetch (key rotation), at most once
//!   per [`KEY_REFETCH_INTERVAL`]; the refetch does not extend the entry's age
//! - Every request is bounded by [`FETCH_TIMEOUT`]
//! - Nothing is committed when a fetch fails or is cancelled

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::error::DiscoveryError;

/// Well-known path appended to the issuer for metadata discovery.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// How long fetched metadata and keys are trusted (1 hour).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Upper bound on each discovery request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum time between key set refetches caused by unknown key ids.
pub const KEY_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

/// Where signing keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Fetch the metadata document, then the `jwks_uri` it advertises
    Metadata(String),
    /// Fetch the key set directly
    Jwks(String),
}

/// Subset of the OIDC provider metadata document we rely on.
#[derive(Debug, Clone, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default)]
    jwks_uri: Option<String>,
    #[serde(default)]
    userinfo_endpoint: Option<String>,
}

/// Resolved provider metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Issuer advertised by the provider (absent with an explicit JWKS URL)
    pub issuer: Option<String>,
    pub jwks_uri: String,
    pub userinfo_endpoint: Option<String>,
}

struct CacheEntry {
    metadata: ProviderMetadata,
    jwks: JwkSet,
    /// Time of the full fetch; governs staleness.
    fetched_at: Instant,
    /// Time of the last unknown-`kid` key set refetch.
    keys_refetched_at: Option<Instant>,
}

/// Per-validator discovery cache.
pub struct DiscoveryCache {
    source: KeySource,
    refresh_interval: Duration,
    key_refetch_interval: Duration,
    fetch_timeout: Duration,
    cache: RwLock<Option<CacheEntry>>,
    refresh_lock: Mutex<()>,
    client: reqwest::Client,
}

impl std::fmt::Debug for DiscoveryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCache")
            .field("source", &self.source)
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}

impl DiscoveryCache {
    pub fn new(source: KeySource, client: reqwest::Client) -> Self {
        Self {
            source,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            key_refetch_interval: KEY_REFETCH_INTERVAL,
            fetch_timeout: FETCH_TIMEOUT,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            client,
        }
    }

    /// Override the refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Override the minimum interval between unknown-`kid` refetches.
    pub fn with_key_refetch_interval(mut self, interval: Duration) -> Self {
        self.key_refetch_interval = interval;
        self
    }

    /// Override the per-request timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    /// Check if an entry is cached and not yet stale.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        self.is_fresh(cache.as_ref())
    }

    /// Cached metadata, if any.
    pub async fn metadata(&self) -> Option<ProviderMetadata> {
        let cache = self.cache.read().await;
        cache.as_ref().map(|entry| entry.metadata.clone())
    }

    fn is_fresh(&self, entry: Option<&CacheEntry>) -> bool {
        entry.is_some_and(|e| e.fetched_at.elapsed() < self.refresh_interval)
    }

    async fn key_refetch_allowed(&self) -> bool {
        let cache = self.cache.read().await;
        cache.as_ref().is_some_and(|entry| {
            entry
                .keys_refetched_at
                .is_none_or(|at| at.elapsed() >= self.key_refetch_interval)
        })
    }

    /// Make sure a fresh entry is cached, fetching one if needed.
    pub async fn ensure_fresh(&self) -> Result<(), DiscoveryError> {
        if self.is_cached().await {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if self.is_cached().await {
            tracing::debug!(source = ?self.source, "Discovery refreshed by concurrent caller");
            return Ok(());
        }

        let entry = self.fetch_entry().await?;
        *self.cache.write().await = Some(entry);
        Ok(())
    }

    /// Force a full refresh.
    pub async fn refresh(&self) -> Result<(), DiscoveryError> {
        let _guard = self.refresh_lock.lock().await;
        let entry = self.fetch_entry().await?;
        *self.cache.write().await = Some(entry);
        Ok(())
    }

    /// Resolve the verification key for a token.
    ///
    /// With a `kid`, the matching key is used and the key set is refetched
    /// once on a miss, unless another miss refetched it within the key
    /// refetch interval. Without one, the first usable signing key is used.
    pub async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, DiscoveryError> {
        self.ensure_fresh().await?;

        if let Some(key) = self.lookup(kid).await {
            return key;
        }

        let Some(kid) = kid else {
            return Err(DiscoveryError::NoMatchingKey);
        };

        if !self.key_refetch_allowed().await {
            tracing::debug!(kid = %kid, "Unknown key id, key set refetched recently");
            return Err(DiscoveryError::NoMatchingKey);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(key) = self.lookup(Some(kid)).await {
            return key;
        }
        if !self.key_refetch_allowed().await {
            return Err(DiscoveryError::NoMatchingKey);
        }

        tracing::debug!(kid = %kid, "Unknown key id, refetching JWKS");
        let jwks_uri = {
            let cache = self.cache.read().await;
            cache
                .as_ref()
                .map(|entry| entry.metadata.jwks_uri.clone())
                .ok_or(DiscoveryError::NoMatchingKey)?
        };
        let jwks: JwkSet = self.get_json(&jwks_uri).await?;

        {
            let mut cache = self.cache.write().await;
            if let Some(entry) = cache.as_mut() {
                entry.jwks = jwks;
                entry.keys_refetched_at = Some(Instant::now());
            }
        }

        self.lookup(Some(kid))
            .await
            .unwrap_or(Err(DiscoveryError::NoMatchingKey))
    }

    async fn lookup(&self, kid: Option<&str>) -> Option<Result<DecodingKey, DiscoveryError>> {
        let cache = self.cache.read().await;
        let jwks = &cache.as_ref()?.jwks;

        match kid {
            Some(kid) => jwks
                .keys
                .iter()
                .find(|k| k.common.key_id.as_deref() == Some(kid))
                .map(jwk_to_decoding_key),
            None => jwks
                .keys
                .iter()
                .filter(|k| is_signing_key(k))
                .find_map(|k| jwk_to_decoding_key(k).ok())
                .map(Ok),
        }
    }

    async fn fetch_entry(&self) -> Result<CacheEntry, DiscoveryError> {
        let metadata = match &self.source {
            KeySource::Metadata(url) => {
                let doc: MetadataDocument = self.get_json(url).await?;
                let jwks_uri = doc
                    .jwks_uri
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| DiscoveryError::MissingJwksUri(url.clone()))?;
                ProviderMetadata {
                    issuer: doc.issuer,
                    jwks_uri,
                    userinfo_endpoint: doc.userinfo_endpoint,
                }
            }
            KeySource::Jwks(url) => ProviderMetadata {
                issuer: None,
                jwks_uri: url.clone(),
                userinfo_endpoint: None,
            },
        };

        let jwks: JwkSet = self.get_json(&metadata.jwks_uri).await?;

        tracing::info!(
            jwks_uri = %metadata.jwks_uri,
            issuer = metadata.issuer.as_deref().unwrap_or("-"),
            keys = jwks.keys.len(),
            "Discovery completed"
        );

        Ok(CacheEntry {
            metadata,
            jwks,
            fetched_at: Instant::now(),
            keys_refetched_at: None,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DiscoveryError> {
        tracing::debug!(url = %url, "Fetching discovery document");

        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| DiscoveryError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            if !response.status().is_success() {
                return Err(DiscoveryError::Status {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }

            response
                .json::<T>()
                .await
                .map_err(|e| DiscoveryError::InvalidDocument {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
        };

        tokio::time::timeout(self.fetch_timeout, request)
            .await
            .map_err(|_| DiscoveryError::Timeout(url.to_string()))?
    }
}

fn is_signing_key(jwk: &Jwk) -> bool {
    !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption))
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, DiscoveryError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| DiscoveryError::UnsupportedKey(format!("RSA key: {e}"))),
        AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y)
            .map_err(|e| DiscoveryError::UnsupportedKey(format!("EC key: {e}"))),
        _ => Err(DiscoveryError::UnsupportedKey(
            "only RSA and EC keys are supported".to_string(),
        )),
    }
}
