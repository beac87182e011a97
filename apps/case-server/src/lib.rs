// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Case Server - case submission with SMS notification
//!
//! Authenticated users submit cases; each case gets a human-readable
//! reference number, is persisted, and triggers an SMS to the submitter.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password hashing and signed bearer credentials
//! - `cases` - Submission workflow and SMS retry
//! - `sms` - SMS providers (mock, AWS SNS)
//! - `storage` - SQLite and redb backends behind one trait

use std::net::SocketAddr;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod accounts;
pub mod api;
pub mod auth;
pub mod cases;
pub mod config;
pub mod error;
pub mod models;
pub mod phone;
pub mod sms;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod validation;

#[cfg(test)]
mod testing;

use crate::auth::CredentialService;
use crate::config::AppConfig;
use crate::state::AppState;

/// In-flight requests get this long to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("sms provider error: {0}")]
    Sms(#[from] sms::SmsError),

    #[error("invalid CLIENT_ORIGIN: {0}")]
    Cors(#[from] axum::http::header::InvalidHeaderValue),

    #[error("invalid bind address {0}")]
    Address(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load configuration, open storage, and serve until SIGINT/SIGTERM.
pub async fn run() -> Result<(), StartupError> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;
    telemetry::init_tracing(config.log_format);

    if config.uses_default_jwt_secret() {
        warn!("JWT_SECRET is not set; using the built-in development secret");
    }

    let store = storage::open_store(&config.storage)?;
    let sms = sms::provider_from_config(&config.sms)?;

    let state = AppState::new(store, sms, CredentialService::new(&config.jwt_secret))
        .with_rate_limit(config.rate_limit);
    let app = api::router(state).layer(api::cors_layer(&config.client_origin)?);

    let bind = config.bind_address();
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| StartupError::Address(format!("{bind}: {e}")))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_shutdown_signal().await;
            info!("Shutdown signal received, draining connections");
            shutdown.cancel();
        }
    });

    match &config.tls {
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Case server listening on http://{addr} (docs at /docs)");
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        }
        Some(tls) => {
            // Another component may already have installed a provider.
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("rustls crypto provider was already installed");
            }

            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(|e| StartupError::Tls(e.to_string()))?;

            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                let shutdown = shutdown.clone();
                async move {
                    shutdown.cancelled().await;
                    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                }
            });

            info!("Case server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await?;
        }
    }

    info!("Case server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("Could not register signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
