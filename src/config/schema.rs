//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the debug proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the debug proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// The single upstream every proxied request is replayed against.
    pub upstream: UpstreamConfig,

    /// Listener for proxied traffic.
    pub proxy: ListenerConfig,

    /// Listener for the inspection API, live feed and static UI.
    pub web: WebConfig,

    /// Exchange retention settings.
    pub capture: CaptureConfig,

    /// Live feed fan-out settings.
    pub broadcast: BroadcastConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to (e.g., "http://localhost:8080").
    pub target_url: String,

    /// Total time allowed for one upstream round trip, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Listener configuration for the proxy port.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8090".to_string(),
        }
    }
}

/// Web interface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address (e.g., "0.0.0.0:8091").
    pub bind_address: String,

    /// Directory of static UI assets served for unmatched paths.
    pub static_dir: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8091".to_string(),
            static_dir: None,
        }
    }
}

/// Capture and retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum number of exchanges kept in memory (oldest evicted first).
    pub max_exchanges: usize,

    /// Maximum size of a buffered request or response body.
    pub max_body_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_exchanges: 1000,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Broadcast hub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Capacity of the hub's publish inbox. Publishes beyond it are dropped.
    pub inbox_capacity: usize,

    /// Capacity of each observer's outbound queue. Overflow disconnects the observer.
    pub outbound_capacity: usize,

    /// Send the current store contents to an observer when it connects.
    pub snapshot_on_connect: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 256,
            outbound_capacity: 256,
            snapshot_on_connect: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
