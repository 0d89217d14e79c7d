//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use arcade_api::{build_app, build_state};
use arcade_cache::StoreManager;
use arcade_core::config::AppConfig;
use arcade_worker::OutboxReceiver;

/// Test application context backed by the in-memory store.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
    _outbox_rx: OutboxReceiver,
}

impl TestApp {
    /// Create a new test application
    pub async fn new() -> Self {
        let config = AppConfig::default();
        let store = Arc::new(
            StoreManager::new(&config.store)
                .await
                .expect("Failed to init store"),
        );
        let (state, outbox_rx) =
            build_state(config.clone(), store).expect("Failed to build state");
        let router = build_app(state, &config.server.cors);

        Self {
            router,
            config,
            _outbox_rx: outbox_rx,
        }
    }

    /// Send a heartbeat for each user so they appear online.
    pub async fn online(&self, users: &[&str]) {
        for user in users {
            let resp = self
                .request("POST", "/api/presence/heartbeat", None, Some(user))
                .await;
            assert_eq!(resp.status, StatusCode::OK, "heartbeat for {user}");
        }
    }

    /// Create a pairwise challenge and return its id.
    pub async fn challenge(&self, from: &str, to: &str) -> String {
        let resp = self
            .request(
                "POST",
                "/api/challenges",
                Some(serde_json::json!({ "to": to, "app_id": "tictactoe" })),
                Some(from),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        resp.body["data"]["id"]
            .as_str()
            .expect("challenge id")
            .to_string()
    }

    /// Make an API request as `user`.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        user: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);

        if let Some(user) = user {
            req = req.header("x-user-id", user);
        }

        let req = match body {
            Some(body) => req
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&body).expect("Failed to serialize body"),
                )),
            None => req.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
