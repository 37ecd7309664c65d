//! Forwarding failures and how callers see them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Every way a forward can fail. Each one aborts before an exchange is recorded.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The inbound request body could not be read (or exceeded the body limit).
    #[error("failed to read request body: {0}")]
    ClientBodyRead(String),

    /// The outbound request could not be built (e.g., the joined URL is invalid).
    #[error("failed to construct upstream request: {0}")]
    RequestConstruction(String),

    /// Connect failure, protocol error, or timeout before response headers.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The upstream body could not be read in full.
    #[error("failed to read upstream response body: {0}")]
    UpstreamBodyRead(String),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::ClientBodyRead(_) => "client_body_read",
            ForwardError::RequestConstruction(_) => "request_construction",
            ForwardError::UpstreamUnreachable(_) => "upstream_unreachable",
            ForwardError::UpstreamBodyRead(_) => "upstream_body_read",
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ForwardError::ClientBodyRead(_) => "Failed to read request body\n",
            ForwardError::RequestConstruction(_) => "Failed to create proxy request\n",
            ForwardError::UpstreamUnreachable(_) => "Failed to proxy request\n",
            ForwardError::UpstreamBodyRead(_) => "Failed to read response body\n",
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
