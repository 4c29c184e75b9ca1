#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] wraps the REAL router, rule table, and templates with an
//! in-memory session store and a recording sink, so tests can observe exactly
//! which registrations were finalized.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;

use registra_kernel::form::{Registration, RegistrationSink, RuleTable};
use registra_kernel::theme::ThemeEngine;
use registra_kernel::{AppState, Config, routes, session};

/// Sink that remembers every registration it accepts.
#[derive(Default)]
pub struct RecordingSink {
    accepted: Mutex<Vec<Registration>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.accepted.lock().unwrap().len()
    }

    pub fn accepted(&self) -> Vec<Registration> {
        self.accepted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistrationSink for RecordingSink {
    async fn accept(&self, registration: &Registration) -> anyhow::Result<()> {
        self.accepted.lock().unwrap().push(registration.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Sink that refuses every registration.
pub struct FailingSink;

#[async_trait]
impl RegistrationSink for FailingSink {
    async fn accept(&self, _registration: &Registration) -> anyhow::Result<()> {
        bail!("storage unavailable")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// In-memory log writer for asserting on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route events on the current thread here until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub sink: Arc<RecordingSink>,
}

impl TestApp {
    /// Create a test application with a recording sink.
    pub fn new() -> Self {
        let sink = Arc::new(RecordingSink::default());
        let router = build_router(sink.clone());
        Self { router, sink }
    }

    /// Create a test application whose sink always fails.
    pub fn with_failing_sink() -> Self {
        let router = build_router(Arc::new(FailingSink));
        Self {
            router,
            sink: Arc::new(RecordingSink::default()),
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// GET a path, carrying cookies if any.
    pub async fn get(&self, path: &str, cookies: &str) -> Response {
        let mut request = Request::get(path).body(Body::empty()).unwrap();
        attach_cookies(&mut request, cookies);
        self.request(request).await
    }

    /// POST a URL-encoded form body, carrying cookies if any.
    pub async fn post_form(&self, path: &str, body: String, cookies: &str) -> Response {
        let mut request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        attach_cookies(&mut request, cookies);
        self.request(request).await
    }

    /// Open the form and return `(session cookies, csrf token)`.
    pub async fn open_form(&self) -> (String, String) {
        let response = self.get("/", "").await;
        let cookies = extract_cookies(&response);
        let html = body_string(response).await;
        let token = registra_test_utils::extract_csrf_token(&html)
            .expect("form should carry a CSRF token");
        assert!(!cookies.is_empty(), "form should start a session");
        (cookies, token)
    }
}

fn build_router(sink: Arc<dyn RegistrationSink>) -> Router {
    let config = Config {
        cookie_secure: false,
        ..Config::default()
    };

    let state = AppState::from_parts(
        RuleTable::registration().expect("Failed to load rules"),
        ThemeEngine::embedded().expect("Failed to load templates"),
        sink,
    )
    .expect("Failed to build AppState");

    // Must match main.rs (minus the Redis branch)
    routes::app(state)
        .layer(session::create_memory_session_layer(&config))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn attach_cookies(request: &mut Request<Body>, cookies: &str) {
    if !cookies.is_empty() {
        request.headers_mut().insert(
            header::COOKIE,
            cookies.parse().expect("Invalid cookie header"),
        );
    }
}

/// Extract Set-Cookie headers from a response for use in subsequent requests.
pub fn extract_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| {
            // Extract just the cookie name=value, ignoring attributes
            cookie.split(';').next()
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Read a response body as UTF-8 text.
pub async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
