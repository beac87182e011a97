// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CaseStatus, CaseSummary, CreateCaseRequest, LoginRequest, RegisterRequest, SmsStatus,
        UserProfile,
    },
    state::AppState,
};

pub mod auth;
pub mod cases;
pub mod health;
pub mod rate_limit;

/// Request bodies larger than this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn router(state: AppState) -> Router {
    let limited = middleware::from_fn_with_state(state.clone(), rate_limit::limit_requests);

    // Only the write routes are rate limited; listing cases is not.
    let api_routes = Router::new()
        .route(
            "/auth/register",
            post(auth::register).route_layer(limited.clone()),
        )
        .route("/auth/login", post(auth::login).route_layer(limited.clone()))
        .route(
            "/cases",
            post(cases::create_case)
                .route_layer(limited)
                .get(cases::list_cases),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
}

/// CORS policy admitting only the configured client origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let origin = HeaderValue::from_str(origin)?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        cases::create_case,
        cases::list_cases,
        health::health,
        health::ready
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            CreateCaseRequest,
            UserProfile,
            CaseSummary,
            CaseStatus,
            SmsStatus,
            auth::AuthResponse,
            cases::CreateCaseResponse,
            cases::CaseListResponse,
            health::HealthResponse,
            health::ReadyResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Cases", description = "Case submission and listing"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::testing::ScriptedSms;

    struct Reply {
        status: StatusCode,
        headers: axum::http::HeaderMap,
        body: Value,
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, headers, body }
    }

    async fn post_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Reply {
        send(app, Method::POST, uri, token, Some(body.to_string())).await
    }

    async fn post_case(app: &Router, token: Option<&str>, body: Value) -> Reply {
        post_json(app, "/api/cases", token, body).await
    }

    async fn register(app: &Router, username: &str, phone: Option<&str>) -> String {
        let reply = post_json(
            app,
            "/api/auth/register",
            None,
            json!({ "username": username, "password": "secret1", "phone": phone }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.body["token"].as_str().unwrap().to_string()
    }

    fn case_body(title: &str) -> Value {
        json!({
            "title": title,
            "description": "Water has been leaking from the ceiling",
            "phone": "+6512345678"
        })
    }

    fn is_reference_number(value: &str) -> bool {
        let parts: Vec<&str> = value.split('-').collect();
        parts.len() == 3
            && parts[0] == "CASE"
            && parts[1].len() == 4
            && parts[2].len() == 4
            && parts[1..].iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::for_tests());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = router(AppState::for_tests());

        let reply = post_json(
            &app,
            "/api/auth/register",
            None,
            json!({ "username": "alice", "password": "secret1", "phone": "+6591234567" }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["message"], "User registered successfully");
        assert_eq!(reply.body["user"]["username"], "alice");
        assert_eq!(reply.body["user"]["phone"], "+6591234567");
        assert!(reply.body["user"].get("passwordHash").is_none());
        assert!(reply.body["user"].get("password_hash").is_none());

        let reply = post_json(
            &app,
            "/api/auth/login",
            None,
            json!({ "username": "alice", "password": "secret1" }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["message"], "Login successful");
        assert!(reply.body["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = router(AppState::for_tests());
        register(&app, "alice", None).await;

        let reply = post_json(
            &app,
            "/api/auth/register",
            None,
            json!({ "username": "alice", "password": "another1" }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.body, json!({ "message": "Username already exists" }));
    }

    #[tokio::test]
    async fn registration_validation_messages() {
        let app = router(AppState::for_tests());

        let reply = post_json(
            &app,
            "/api/auth/register",
            None,
            json!({ "username": "alice", "password": "short" }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["message"], "Password must be at least 6 characters");

        let reply = post_json(
            &app,
            "/api/auth/register",
            None,
            json!({ "username": "alice", "password": "secret1", "phone": "91234567" }),
        )
        .await;
        assert_eq!(
            reply.body["message"],
            "Phone must be in E.164 format (e.g., +6591234567)"
        );
    }

    #[tokio::test]
    async fn bad_login_is_uniform() {
        let app = router(AppState::for_tests());
        register(&app, "alice", None).await;

        for body in [
            json!({ "username": "alice", "password": "wrong-password" }),
            json!({ "username": "nobody", "password": "secret1" }),
        ] {
            let reply = post_json(&app, "/api/auth/login", None, body).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
            assert_eq!(reply.body, json!({ "message": "Invalid username or password" }));
        }
    }

    #[tokio::test]
    async fn case_endpoints_require_credentials() {
        let app = router(AppState::for_tests());

        let reply = send(&app, Method::GET, "/api/cases", None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body, json!({ "message": "Invalid or expired token" }));

        let reply = post_case(&app, Some("not-a-token"), case_body("Broken street light")).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body, json!({ "message": "Invalid or expired token" }));
    }

    #[tokio::test]
    async fn auth_is_checked_before_payload() {
        let app = router(AppState::for_tests());
        let reply = post_case(&app, None, json!({ "title": "x" })).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submit_and_list_cases() {
        let app = router(AppState::for_tests());
        let token = register(&app, "alice", None).await;

        let first = post_case(&app, Some(&token), case_body("First broken light")).await;
        assert_eq!(first.status, StatusCode::CREATED);
        assert_eq!(first.body["message"], "Case submitted successfully");
        assert_eq!(first.body["smsStatus"], "SENT");
        assert_eq!(first.body["smsProvider"], "MOCK");
        assert_eq!(first.body["maskedPhone"], "+65****5678");
        assert!(is_reference_number(first.body["referenceNumber"].as_str().unwrap()));

        let second = post_case(&app, Some(&token), case_body("Second broken light")).await;
        assert_eq!(second.status, StatusCode::CREATED);

        let reply = send(&app, Method::GET, "/api/cases", Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        let cases = reply.body["cases"].as_array().unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0]["title"], "Second broken light");
        assert_eq!(cases[1]["title"], "First broken light");
        assert_eq!(cases[0]["status"], "SUBMITTED");
        assert_eq!(cases[0]["smsStatus"], "SENT");
        assert!(cases[0].get("phone").is_none());
        assert!(cases[0].get("description").is_none());
    }

    #[tokio::test]
    async fn cases_are_private_to_their_owner() {
        let app = router(AppState::for_tests());
        let alice = register(&app, "alice", None).await;
        let bob = register(&app, "bob", None).await;

        post_case(&app, Some(&alice), case_body("Alice's broken light")).await;

        let reply = send(&app, Method::GET, "/api/cases", Some(&bob), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({ "cases": [] }));
    }

    #[tokio::test]
    async fn failed_delivery_still_returns_created() {
        let app = router(AppState::with_provider(Arc::new(ScriptedSms::new([]))));
        let token = register(&app, "alice", None).await;

        let reply = post_case(&app, Some(&token), case_body("Broken street light")).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["smsStatus"], "FAILED");
        assert_eq!(reply.body["smsProvider"], "SCRIPTED");
    }

    #[tokio::test]
    async fn profile_phone_is_used_when_omitted() {
        let app = router(AppState::for_tests());
        let token = register(&app, "alice", Some("+6598765432")).await;

        let reply = post_json(
            &app,
            "/api/cases",
            Some(&token),
            json!({ "title": "Broken street light", "description": "Out for a whole week" }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["maskedPhone"], "+65****5432");

        let no_phone = register(&app, "bob", None).await;
        let reply = post_json(
            &app,
            "/api/cases",
            Some(&no_phone),
            json!({ "title": "Broken street light", "description": "Out for a whole week" }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body, json!({ "message": "Phone number is required" }));
    }

    #[tokio::test]
    async fn invalid_case_payloads() {
        let app = router(AppState::for_tests());
        let token = register(&app, "alice", None).await;

        let reply = post_json(
            &app,
            "/api/cases",
            Some(&token),
            json!({
                "title": "Short",
                "description": "Water has been leaking",
                "phone": "+6512345678"
            }),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["message"], "Invalid request payload");
        assert_eq!(
            reply.body["details"]["fieldErrors"]["title"][0],
            "Title must be at least 10 characters"
        );

        let mut unknown = case_body("Broken street light");
        unknown["name"] = json!("extra");
        let reply = post_case(&app, Some(&token), unknown).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["message"], "Invalid request payload");

        let malformed = Some("{not json".to_string());
        let reply = send(&app, Method::POST, "/api/cases", Some(&token), malformed).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["message"], "Invalid request payload");
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let app = router(AppState::for_tests());
        let token = register(&app, "alice", None).await;

        let mut body = case_body("Broken street light");
        body["description"] = json!("d".repeat(MAX_BODY_BYTES + 1));
        let reply = post_case(&app, Some(&token), body).await;
        assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn health_and_request_id() {
        let app = router(AppState::for_tests());

        let reply = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({ "status": "healthy" }));
        assert!(reply.headers.get("x-request-id").is_some());

        let reply = send(&app, Method::GET, "/health/ready", None, None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["backend"], "sqlite");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = router(AppState::for_tests());
        let reply = send(&app, Method::GET, "/api-doc/openapi.json", None, None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body["paths"].get("/api/cases").is_some());
        assert!(reply.body["components"]["securitySchemes"].get("bearer_auth").is_some());
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let app = router(AppState::for_tests()).layer(cors_layer("http://localhost:5173").unwrap());

        let request = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );

        let request = Request::builder()
            .uri("/health")
            .header("origin", "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn invalid_origin_is_an_error() {
        assert!(cors_layer("bad\norigin").is_err());
    }

    #[tokio::test]
    async fn wrongly_typed_credentials_are_invalid_input() {
        let app = router(AppState::for_tests());

        for (uri, body) in [
            ("/api/auth/register", json!({ "username": 12345, "password": "secret1" })),
            ("/api/auth/register", json!({ "username": "alice", "password": true })),
            ("/api/auth/login", json!({ "username": ["alice"], "password": "secret1" })),
            ("/api/auth/login", json!({ "username": "alice", "password": 123456 })),
        ] {
            let reply = post_json(&app, uri, None, body).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(reply.body, json!({ "message": "Invalid input" }), "{uri}");
        }

        let malformed = Some("{not json".to_string());
        let reply = send(&app, Method::POST, "/api/auth/login", None, malformed).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["message"], "Invalid request payload");
    }

    #[tokio::test]
    async fn write_routes_are_rate_limited_per_client() {
        use crate::config::RateLimitConfig;
        use axum::extract::ConnectInfo;
        use std::net::SocketAddr;
        use std::time::Duration;

        let state = AppState::for_tests().with_rate_limit(RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 2,
        });
        let app = router(state);

        let login_from = |ip: [u8; 4]| {
            let mut request = Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"username":"nobody","password":"secret1"}"#))
                .unwrap();
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
            app.clone().oneshot(request)
        };

        for _ in 0..2 {
            let response = login_from([10, 0, 0, 1]).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(response.headers().contains_key("ratelimit-remaining"));
        }

        let response = login_from([10, 0, 0, 1]).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({ "message": "Too many requests, please try again later." })
        );

        let response = login_from([10, 0, 0, 2]).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn listing_cases_is_not_rate_limited() {
        use crate::config::RateLimitConfig;
        use std::time::Duration;

        let state = AppState::for_tests().with_rate_limit(RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 1,
        });
        let app = router(state);
        let token = register(&app, "alice", None).await;

        for _ in 0..3 {
            let reply = send(&app, Method::GET, "/api/cases", Some(&token), None).await;
            assert_eq!(reply.status, StatusCode::OK);
        }

        let reply = post_case(&app, Some(&token), case_body("Broken street light")).await;
        assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
