//! Request/response audit recording.
//!
//! Buffers the request body, forwards the request, buffers the response body,
//! and hands an [`AuditRecord`] to the sink. Both bodies are replayed
//! downstream untouched. Recording is best-effort: a sink failure is logged
//! and swallowed, never surfaced to the client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tower::{Layer, Service};
use tracing::warn;

use rsrbac_domain::Principal;
use rsrbac_storage::{AuditRecord, AuditSink};

use crate::config::AuditLogSettings;
use crate::http::ApiResponse;
use crate::middleware::is_excluded;

/// Hard cap on the recorded URL, independent of `max_body_length`.
const MAX_URL_LENGTH: usize = 2000;

/// Tower layer that records request activity to an [`AuditSink`].
pub struct AuditLayer<S> {
    settings: Arc<AuditLogSettings>,
    sink: Arc<S>,
}

impl<S> AuditLayer<S> {
    pub fn new(settings: AuditLogSettings, sink: Arc<S>) -> Self {
        Self {
            settings: Arc::new(settings),
            sink,
        }
    }
}

impl<S> Clone for AuditLayer<S> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S, Svc> Layer<Svc> for AuditLayer<S> {
    type Service = AuditService<S, Svc>;

    fn layer(&self, inner: Svc) -> Self::Service {
        AuditService {
            inner,
            settings: Arc::clone(&self.settings),
            sink: Arc::clone(&self.sink),
        }
    }
}

/// Middleware service produced by [`AuditLayer`].
pub struct AuditService<S, Svc> {
    inner: Svc,
    settings: Arc<AuditLogSettings>,
    sink: Arc<S>,
}

impl<S, Svc: Clone> Clone for AuditService<S, Svc> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            settings: Arc::clone(&self.settings),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S, Svc> Service<Request<Body>> for AuditService<S, Svc>
where
    S: AuditSink,
    Svc: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Svc::Future: Send + 'static,
{
    type Response = Response;
    type Error = Svc::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Svc::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if !self.settings.enabled || is_excluded(request.uri().path(), &self.settings.exclude_paths)
        {
            return Box::pin(self.inner.call(request));
        }

        let settings = Arc::clone(&self.settings);
        let sink = Arc::clone(&self.sink);

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let method = request.method().to_string();
            let url = truncate_url(&request.uri().to_string());
            let actor_username = request
                .extensions()
                .get::<Principal>()
                .map(|p| p.username.clone());

            let (parts, body) = request.into_parts();
            let request_bytes = match to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    // An outer body-limit layer surfaces here as a read error.
                    warn!(%method, %url, error = %err, "failed to buffer request body");
                    return Ok(
                        ApiResponse::error("Request body too large or unreadable", 413)
                            .into_response(),
                    );
                }
            };
            let request_body = capture_body(&request_bytes, settings.max_body_length);
            let request = Request::from_parts(parts, Body::from(request_bytes));

            let response = inner.call(request).await?;

            let (parts, body) = response.into_parts();
            let response_bytes = match to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(%method, %url, error = %err, "failed to buffer response body");
                    Bytes::new()
                }
            };
            let response_body = capture_body(&response_bytes, settings.max_body_length);
            let response = Response::from_parts(parts, Body::from(response_bytes));

            let record = AuditRecord {
                method,
                url,
                request_body,
                response_body,
                actor_username,
                recorded_at: chrono::Utc::now(),
            };
            if let Err(err) = sink.write(record).await {
                warn!(error = %err, "failed to save audit log");
            }

            Ok(response)
        })
    }
}

/// Lossy-decode a buffered body, dropping empty bodies and truncating long ones.
fn capture_body(bytes: &Bytes, max_length: usize) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() > max_length {
        let truncated: String = text.chars().take(max_length).collect();
        Some(format!("{truncated}...[truncated]"))
    } else {
        Some(text.into_owned())
    }
}

fn truncate_url(url: &str) -> String {
    if url.chars().count() > MAX_URL_LENGTH {
        let truncated: String = url.chars().take(MAX_URL_LENGTH).collect();
        format!("{truncated}...")
    } else {
        url.to_string()
    }
}
