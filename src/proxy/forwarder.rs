//! Request forwarding and exchange capture.
//!
//! # Responsibilities
//! - Buffer the inbound body
//! - Replay method, headers and body verbatim against `target + path [+ ?query]`;
//!   only `Host` is replaced, by the target's authority
//! - Enforce one deadline over the upstream round trip
//! - Return the upstream status, headers and body untouched
//! - Record exactly one exchange per successful round trip
//!
//! # Design Decisions
//! - No retries: every upstream call is one-shot
//! - Failures never produce an exchange
//! - Duration runs from receipt of the inbound request until the upstream
//!   body has been fully read

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{header, Request, Response};
use chrono::Utc;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use uuid::Uuid;

use crate::capture::{Exchange, LogStore};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::proxy::error::ForwardError;

/// Replays inbound requests against the single upstream target.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    target: String,
    timeout: Duration,
    max_body_bytes: usize,
    store: Arc<LogStore>,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig, store: Arc<LogStore>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            client,
            target: config.upstream.target_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.upstream.timeout_secs),
            max_body_bytes: config.capture.max_body_bytes,
            store,
        }
    }

    /// Upstream base URL, without a trailing slash.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Forward one request. On success the exchange is already in the store
    /// when this returns.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let result = self.round_trip(request).await;
        if let Err(e) = &result {
            tracing::warn!(
                method = %method,
                uri = %uri,
                kind = e.kind(),
                error = %e,
                "Forwarding failed"
            );
            metrics::record_forward_error(e.kind());
        }
        result
    }

    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let started = Instant::now();
        let timestamp = Utc::now();

        let (mut parts, body) = request.into_parts();
        // The client addressed the proxy; the client library derives Host from the target.
        parts.headers.remove(header::HOST);
        let request_body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ForwardError::ClientBodyRead(e.to_string()))?;

        let url = match parts.uri.query().filter(|q| !q.is_empty()) {
            Some(query) => format!("{}?{}", parts.uri.path(), query),
            None => parts.uri.path().to_string(),
        };
        let upstream_url = format!("{}{}", self.target, url);

        let mut outbound = Request::builder()
            .method(parts.method.clone())
            .uri(upstream_url.as_str())
            .body(Body::from(request_body.clone()))
            .map_err(|e| ForwardError::RequestConstruction(e.to_string()))?;
        *outbound.headers_mut() = parts.headers.clone();

        tracing::debug!(
            method = %parts.method,
            upstream = %upstream_url,
            "Proxying request"
        );

        let deadline = tokio::time::Instant::now() + self.timeout;
        let response: Response<Incoming> =
            match tokio::time::timeout_at(deadline, self.client.request(outbound)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(ForwardError::UpstreamUnreachable(e.to_string())),
                Err(_) => {
                    return Err(ForwardError::UpstreamUnreachable(format!(
                        "no response within {}s",
                        self.timeout.as_secs()
                    )))
                }
            };

        let (response_parts, response_body) = response.into_parts();
        let response_body: Bytes = match tokio::time::timeout_at(
            deadline,
            axum::body::to_bytes(Body::new(response_body), self.max_body_bytes),
        )
        .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(ForwardError::UpstreamBodyRead(e.to_string())),
            Err(_) => {
                return Err(ForwardError::UpstreamBodyRead(format!(
                    "body not complete within {}s",
                    self.timeout.as_secs()
                )))
            }
        };
        let duration = started.elapsed();

        let exchange = self.store.append(Exchange {
            id: Uuid::new_v4(),
            timestamp,
            method: parts.method.to_string(),
            url,
            request_headers: parts.headers,
            request_body,
            response_headers: response_parts.headers.clone(),
            response_body: response_body.clone(),
            status_code: response_parts.status.as_u16(),
            duration,
        });

        metrics::record_exchange(&exchange.method, exchange.status_code, duration);
        tracing::info!(
            exchange_id = %exchange.id,
            method = %exchange.method,
            url = %exchange.url,
            status = exchange.status_code,
            duration_ms = exchange.duration_ms(),
            "Exchange captured"
        );

        let mut response = Response::new(Body::from(response_body));
        *response.status_mut() = response_parts.status;
        *response.headers_mut() = response_parts.headers;
        Ok(response)
    }
}
