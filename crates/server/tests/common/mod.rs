//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock order source injected, so lookups and polling can be driven
//! without an orders backend.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use orderwatch_core::{
    testing::MockOrderSource, BrandingConfig, Config, OrderSource, OrdersApiConfig, ServerConfig,
    StatusChange, Tracker, TrackerConfig,
};
use orderwatch_server::api::{create_router, WsBroadcaster};
use orderwatch_server::state::AppState;

/// Re-export fixtures for test convenience
pub use orderwatch_core::testing::fixtures;

/// Test fixture for E2E testing with a mock order source.
///
/// The poll loop is not started; tests drive polling with
/// `fixture.tracker.poll_once()`.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_lookup() {
///     let fixture = TestFixture::new().await;
///     fixture.source.add_order(fixtures::todays_order("1", "0042", "9876543210", 0)).await;
///
///     let response = fixture.post("/api/v1/track", json!({
///         "suffix": "0042",
///         "mobile": "9876543210"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock order source - configure the upstream order list
    pub source: Arc<MockOrderSource>,
    /// Tracker behind the router
    pub tracker: Arc<Tracker>,
    /// Broadcaster behind the router
    pub ws_broadcaster: WsBroadcaster,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// Parsed JSON body, or `Null` when the body is not JSON
    pub body: Value,
    /// Raw body text
    pub text: String,
    /// `Location` header, for redirects
    pub location: Option<String>,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_branding(BrandingConfig::default()).await
    }

    /// Create a test fixture with custom branding.
    pub async fn with_branding(branding: BrandingConfig) -> Self {
        let source = Arc::new(MockOrderSource::new());

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            orders_api: OrdersApiConfig {
                base_url: "http://orders.invalid".to_string(),
                orders_path: "/api/orders".to_string(),
                timeout_secs: 5,
                api_key: Some("secret".to_string()),
                user_agent: "orderwatch-test".to_string(),
            },
            tracker: TrackerConfig::default(),
            branding,
        };

        let ws_broadcaster = WsBroadcaster::default();
        let broadcaster_for_callback = ws_broadcaster.clone();

        let tracker = Arc::new(
            Tracker::new(
                config.tracker.clone(),
                Arc::clone(&source) as Arc<dyn OrderSource>,
            )
            .with_update_callback(Arc::new(move |session_id: &str, changes: &[StatusChange]| {
                broadcaster_for_callback.status_update(session_id, changes);
            })),
        );

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&tracker),
            ws_broadcaster.clone(),
        ));

        let router = create_router(state);

        Self {
            router,
            source,
            tracker,
            ws_broadcaster,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with an urlencoded form body.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        self.request_raw("POST", path, &body, "application/x-www-form-urlencoded")
            .await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request_raw("POST", path, body, "application/json").await
    }

    /// Send a request with raw string body and custom content type.
    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            body,
            text,
            location,
        }
    }

    /// Open a tracking session through the JSON API and return its ID.
    pub async fn start_session(&self, suffix: &str, mobile: &str) -> String {
        let response = self
            .post(
                "/api/v1/track",
                serde_json::json!({ "suffix": suffix, "mobile": mobile }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.body["id"]
            .as_str()
            .expect("session id")
            .to_string()
    }
}
