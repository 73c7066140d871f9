#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use student_api::app::{app, AppState};
use student_api::auth::{encode_token, Claims};
use student_api::config::AppConfig;
use student_api::database::{MemoryStudentStore, StudentStore};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Router over a fresh in-memory store, driven in-process.
pub struct TestApp {
    pub router: Router,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStudentStore::new()), AppConfig::development())
    }

    /// Any store and environment preset; the test secret is always applied.
    pub fn with_store(store: Arc<dyn StudentStore>, mut config: AppConfig) -> Self {
        config.security.jwt_secret = TEST_SECRET.to_string();
        config.query.debug_logging = false;

        let state = AppState::new(store, Arc::new(config));
        Self {
            router: app(state),
            token: token_for("registrar"),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request")).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&self.token), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&self.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(&self.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&self.token), None).await
    }

    /// Create a student and return its id.
    pub async fn create(&self, body: Value) -> String {
        let (status, res) = self.post("/api/students", body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", res);
        res["data"]["id"].as_str().expect("id").to_string()
    }
}

pub fn token_for(subject: &str) -> String {
    encode_token(&Claims::new(subject, chrono::Duration::hours(1)), TEST_SECRET).expect("token")
}

/// A valid create body; `n` keeps the unique fields distinct.
pub fn student_body(n: u32) -> Value {
    json!({
        "studentId": format!("STU{:04}", n),
        "firstName": format!("Student{}", n),
        "lastName": "Example",
        "email": format!("student{}@university.edu", n),
        "course": "Computer Science",
        "enrollmentYear": 2020,
    })
}

/// The server binary on a real socket, backed by the in-memory store.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_student-api"))
            .args(["--memory", "--port", &port.to_string()])
            .env("JWT_SECRET", TEST_SECRET)
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        let server = Self { port, base_url, child };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
