//! Configuration validation.
//!
//! Serde handles syntax; this checks semantics. Validation is a pure function
//! that reports every problem it finds, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.target_url '{0}' is not a valid URL")]
    InvalidTargetUrl(String),

    #[error("upstream.target_url scheme '{0}' is not supported (expected http)")]
    UnsupportedScheme(String),

    #[error("upstream.target_url '{0}' has no host")]
    MissingHost(String),

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("proxy and web listeners cannot share address {0}")]
    ListenerConflict(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target = &config.upstream.target_url;
    match Url::parse(target) {
        Ok(url) => {
            if url.scheme() != "http" {
                errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::MissingHost(target.clone()));
            }
        }
        Err(_) => errors.push(ValidationError::InvalidTargetUrl(target.clone())),
    }

    let proxy_addr = check_addr("proxy.bind_address", &config.proxy.bind_address, &mut errors);
    let web_addr = check_addr("web.bind_address", &config.web.bind_address, &mut errors);
    if let (Some(proxy), Some(web)) = (proxy_addr, web_addr) {
        if proxy == web {
            errors.push(ValidationError::ListenerConflict(proxy.to_string()));
        }
    }

    if config.observability.metrics_enabled {
        check_addr(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    let positive = [
        ("upstream.timeout_secs", config.upstream.timeout_secs as usize),
        ("capture.max_exchanges", config.capture.max_exchanges),
        ("capture.max_body_bytes", config.capture.max_body_bytes),
        ("broadcast.inbox_capacity", config.broadcast.inbox_capacity),
        ("broadcast.outbound_capacity", config.broadcast.outbound_capacity),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    match value.parse::<SocketAddr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidBindAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}
