// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application, and loads the authentication settings file.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH_CONFIG_PATH` | Auth settings file (`.yaml`, `.yml`, `.json` or `.toml`) | `config/auth.yaml` if present, else auth disabled |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` | PEM certificate chain for HTTPS | unset (plain HTTP) |
//! | `TLS_KEY_PATH` | PEM private key for HTTPS | unset (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! ## Settings File
//!
//! ```yaml
//! providers:
//!   acme-oidc:
//!     type: oidc
//!     issuer: https://idp.example.com
//!     audience: ${ORDERS_AUDIENCE}
//!
//! domains:
//!   ORDERS:
//!     enabled: true
//!     provider: acme-oidc
//!     require_groups: [staff]
//! ```
//!
//! String values of the exact form `${NAME}` are replaced with the value of
//! the environment variable `NAME` when it is set.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::auth::{AuthSettings, ConfigError};

/// Environment variable name for the auth settings file path.
pub const AUTH_CONFIG_PATH_ENV: &str = "AUTH_CONFIG_PATH";

/// Environment variable name for the bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the TLS certificate chain (PEM).
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";

/// Environment variable name for the TLS private key (PEM).
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Settings file used when `AUTH_CONFIG_PATH` is unset or points nowhere.
pub const DEFAULT_AUTH_CONFIG_PATH: &str = "config/auth.yaml";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Pick the settings file: `explicit` when it exists, else `fallback` when it
/// exists, else none.
pub fn resolve_auth_config_path(explicit: Option<PathBuf>, fallback: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(path = %path.display(), "Auth config path does not exist, trying default");
    }
    fallback.exists().then(|| fallback.to_path_buf())
}

/// Load auth settings from `path`.
///
/// No path, or a path that does not exist, yields empty settings
/// (authentication disabled everywhere). Callers should run
/// [`AuthSettings::validate`] on the result.
pub fn load_auth_settings(path: Option<&Path>) -> Result<AuthSettings, ConfigError> {
    let Some(path) = path else {
        tracing::info!("No auth config path set, authentication disabled");
        return Ok(AuthSettings::default());
    };

    if !path.exists() {
        tracing::warn!(path = %path.display(), "Auth config file not found, authentication disabled");
        return Ok(AuthSettings::default());
    }

    let path_str = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path_str.clone(),
        reason: e.to_string(),
    })?;

    let parse_error = |reason: String| ConfigError::Parse {
        path: path_str.clone(),
        reason,
    };

    let raw: Value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") if text.trim().is_empty() => Value::Null,
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))?
        }
        Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
        Some("toml") => toml::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
        _ => return Err(ConfigError::UnsupportedFormat(path_str.clone())),
    };
    // An empty YAML document means defaults.
    let raw = match raw {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };

    let settings: AuthSettings =
        serde_json::from_value(expand_env(raw)).map_err(|e| parse_error(e.to_string()))?;
    let settings = settings.normalize();

    tracing::info!(
        path = %path_str,
        providers = settings.providers.len(),
        domains = settings.domains.len(),
        "Loaded auth config"
    );
    Ok(settings)
}

/// Replace `${NAME}` string values with environment variables, recursively.
fn expand_env(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let var = s
                .strip_prefix("${")
                .and_then(|rest| rest.strip_suffix('}'))
                .and_then(|name| std::env::var(name).ok());
            Value::String(var.unwrap_or(s))
        }
        Value::Array(items) => Value::Array(items.into_iter().map(expand_env).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, expand_env(value)))
                .collect(),
        ),
        other => other,
    }
}
