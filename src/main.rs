//! HTTP Debugging Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 DEBUG PROXY                    │
//!   Client Request     │  ┌───────────┐   ┌───────────┐                 │
//!   ───────────────────┼─▶│  proxy    │──▶│ forwarder │─────────────────┼──▶ Upstream
//!   ◀──────────────────┼──│ listener  │◀──│           │◀────────────────┼───
//!                      │  └───────────┘   └─────┬─────┘                 │
//!                      │                        │ Exchange              │
//!                      │                        ▼                       │
//!                      │                  ┌───────────┐                 │
//!                      │                  │ LogStore  │ (bounded FIFO)  │
//!                      │                  └─────┬─────┘                 │
//!                      │                        │ publish               │
//!                      │                        ▼                       │
//!   Observers (ws)     │  ┌───────────┐   ┌───────────┐                 │
//!   ◀──────────────────┼──│connection │◀──│    hub    │                 │
//!                      │  └───────────┘   └───────────┘                 │
//!   API / UI           │  ┌───────────────────────────┐                 │
//!   ◀─────────────────▶┼──│ web listener (/api, UI)   │                 │
//!                      │  └───────────────────────────┘                 │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_debug_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use http_debug_proxy::lifecycle::signals::shutdown_signal;
use http_debug_proxy::observability::{logging, metrics};
use http_debug_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "debug-proxy")]
#[command(about = "HTTP debugging proxy with a live exchange feed", long_about = None)]
struct Args {
    /// TOML configuration file. Flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target API server URL
    #[arg(long)]
    target: Option<String>,

    /// Proxy server port
    #[arg(long)]
    proxy_port: Option<u16>,

    /// Web interface port
    #[arg(long)]
    web_port: Option<u16>,

    /// Maximum number of exchanges kept in memory
    #[arg(long)]
    max_logs: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(target) = self.target {
            config.upstream.target_url = target;
        }
        if let Some(port) = self.proxy_port {
            config.proxy.bind_address = format!("0.0.0.0:{port}");
        }
        if let Some(port) = self.web_port {
            config.web.bind_address = format!("0.0.0.0:{port}");
        }
        if let Some(max) = self.max_logs {
            config.capture.max_exchanges = max;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config()?;

    logging::init(&config.observability);
    tracing::info!("debug-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        upstream = %config.upstream.target_url,
        proxy_address = %config.proxy.bind_address,
        web_address = %config.web.bind_address,
        max_exchanges = config.capture.max_exchanges,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let proxy_listener = TcpListener::bind(&config.proxy.bind_address).await?;
    let web_listener = TcpListener::bind(&config.web.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(config)
        .run(proxy_listener, web_listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
