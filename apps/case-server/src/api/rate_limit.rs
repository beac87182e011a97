// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-client fixed-window rate limiting for the write routes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Expired windows are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl Decision {
    fn apply_headers(&self, headers: &mut HeaderMap) {
        let reset = HeaderValue::from(self.reset_after.as_secs().max(1));
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        if !self.allowed {
            headers.insert(axum::http::header::RETRY_AFTER, reset.clone());
        }
        headers.insert(RATELIMIT_RESET, reset);
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    /// Count one request from `key` at `now`.
    ///
    /// Rejected requests still count, so a client hammering the route does
    /// not get its window back early.
    pub async fn check_at(&self, key: &str, now: Instant) -> Decision {
        let RateLimitConfig {
            window,
            max_requests,
        } = self.config;

        let mut windows = self.windows.lock().await;
        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                hits: 0,
            };
        }
        entry.hits = entry.hits.saturating_add(1);

        Decision {
            allowed: entry.hits <= max_requests,
            limit: max_requests,
            remaining: max_requests.saturating_sub(entry.hits),
            reset_after: window.saturating_sub(now.duration_since(entry.started)),
        }
    }
}

/// Client address as seen by the listener, or `unknown` when the server was
/// not started with connect info.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware for `from_fn_with_state`.
pub async fn limit_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);
    let decision = state.rate_limiter.check(&client).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %client,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        ApiError::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE).into_response()
    };
    decision.apply_headers(response.headers_mut());
    response
}
