//! # Request Metrics
//!
//! Lightweight in-process metrics using atomic counters: requests
//! served, error responses, and approval decisions recorded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;

/// Shared metrics state.
#[derive(Debug, Clone)]
pub struct ApiMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub decision_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            decision_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Requests served so far.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Error responses (4xx and 5xx) so far.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Approval decisions recorded so far.
    pub fn decisions(&self) -> u64 {
        self.decision_count.load(Ordering::Relaxed)
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a request is an approval-decision submission.
fn is_decision(method: &Method, path: &str) -> bool {
    method == Method::POST && path.starts_with("/v1/requests/") && path.ends_with("/decision")
}

/// Middleware that increments request, error, and decision counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let decision = is_decision(request.method(), request.uri().path());

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if response.status().is_client_error() || response.status().is_server_error() {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
        if decision && response.status().is_success() {
            m.decision_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}
