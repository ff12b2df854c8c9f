// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use relational_domain_auth::{
    api::router,
    auth::{AuthenticationManager, ConfigError},
    config::{
        load_auth_settings, resolve_auth_config_path, AUTH_CONFIG_PATH_ENV,
        DEFAULT_AUTH_CONFIG_PATH, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, HOST_ENV,
        LOG_FORMAT_ENV, PORT_ENV, TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV,
    },
    state::AppState,
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid auth configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid bind address {0}")]
    Address(String),

    #[error("failed to load TLS credentials: {0}")]
    Tls(std::io::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

async fn run() -> Result<(), StartupError> {
    let config_path = resolve_auth_config_path(
        env::var(AUTH_CONFIG_PATH_ENV).ok().map(PathBuf::from),
        Path::new(DEFAULT_AUTH_CONFIG_PATH),
    );
    let settings = load_auth_settings(config_path.as_deref())?;
    settings.validate()?;

    let manager = AuthenticationManager::new(settings)?;
    for domain in manager.domains() {
        tracing::info!(
            domain = %domain,
            enabled = manager.is_authentication_enabled(domain),
            "Domain configured"
        );
    }

    let app = router(AppState::new(manager));

    let host = env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port: u16 = env::var(PORT_ENV)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|_| StartupError::Address(format!("{host}:{port}")))?;

    let shutdown = CancellationToken::new();
    let handle = Handle::<SocketAddr>::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        let handle = handle.clone();
        async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    tracing::info!("Shutdown signal received, draining connections");
                    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                }
                _ = shutdown.cancelled() => {}
            }
        }
    });

    let tls = match (env::var(TLS_CERT_PATH_ENV), env::var(TLS_KEY_PATH_ENV)) {
        (Ok(cert), Ok(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
        (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
            tracing::warn!(
                "Only one of {TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} is set, serving plain HTTP"
            );
            None
        }
        _ => None,
    };

    match tls {
        Some((cert, key)) => {
            let tls_config = load_tls(&cert, &key).await?;
            tracing::info!(%addr, "Domain auth server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)?;
        }
        None => {
            tracing::info!(%addr, "Domain auth server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)?;
        }
    }

    // Stop the signal watcher.
    shutdown.cancel();
    tracing::info!("Server stopped");
    Ok(())
}

async fn load_tls(cert: &Path, key: &Path) -> Result<RustlsConfig, StartupError> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    let _ = rustls::crypto::ring::default_provider().install_default();

    RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(StartupError::Tls)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
