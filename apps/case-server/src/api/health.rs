// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness response with the storage probe result.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("healthy" or "degraded").
    pub status: String,
    /// Active storage backend.
    pub backend: String,
    /// Storage probe result ("ok" or "unavailable").
    pub storage: String,
}

/// Liveness probe. Always 200 while the process is serving.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is running", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe.
///
/// Returns 200 if the storage backend answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Storage is reachable", body = ReadyResponse),
        (status = 503, description = "Storage probe failed", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let backend = state.store.backend().to_string();
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "healthy".to_string(),
                backend,
                storage: "ok".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(backend = %backend, error = %e, "Storage health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "degraded".to_string(),
                    backend,
                    storage: "unavailable".to_string(),
                }),
            )
        }
    }
}
