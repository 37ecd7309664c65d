//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared application context once and hand it to every handler
//! - Proxy listener: every method and path goes to the forwarder
//! - Web listener: inspection API, live feed, optional static UI, CORS
//! - Run the broadcast hub alongside both listeners and stop all three together

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::broadcast::{BroadcastHub, HubHandle};
use crate::capture::LogStore;
use crate::config::ProxyConfig;
use crate::http::api;
use crate::http::middleware::cors::cors_middleware;
use crate::http::websocket::ws_handler;
use crate::lifecycle::shutdown::wait_for;
use crate::proxy::{ForwardError, Forwarder};

/// Application context injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub store: Arc<LogStore>,
    pub hub: HubHandle,
    pub forwarder: Arc<Forwarder>,
}

/// The debug proxy: two listeners sharing one store and one hub.
pub struct HttpServer {
    state: AppState,
    hub: BroadcastHub,
}

impl HttpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let (hub, hub_handle) = BroadcastHub::new(&config.broadcast);
        let store = Arc::new(LogStore::new(config.capture.max_exchanges, hub_handle.clone()));
        let forwarder = Arc::new(Forwarder::new(&config, Arc::clone(&store)));

        let state = AppState {
            config: Arc::new(config),
            store,
            hub: hub_handle,
            forwarder,
        };
        Self { state, hub }
    }

    /// Shared context, e.g. for inspecting the store from tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Router for proxied traffic.
    pub fn proxy_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Router for the inspection API and live feed.
    pub fn web_router(state: AppState) -> Router {
        let static_dir = state.config.web.static_dir.clone();

        let mut router = Router::new()
            .route("/api/logs", get(api::list_logs))
            .route("/api/logs/clear", any(api::clear_logs))
            .route("/api/status", get(api::status))
            .route("/api/ws", get(ws_handler))
            .with_state(state);

        if let Some(dir) = static_dir {
            router = router.fallback_service(ServeDir::new(dir));
        }

        router
            .layer(middleware::from_fn(cors_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        proxy_listener: TcpListener,
        web_listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let proxy_addr = proxy_listener.local_addr()?;
        let web_addr = web_listener.local_addr()?;
        tracing::info!(
            proxy_address = %proxy_addr,
            web_address = %web_addr,
            upstream = %self.state.forwarder.target(),
            "HTTP servers starting"
        );

        let hub = tokio::spawn(self.hub.run(shutdown.resubscribe()));

        let proxy = axum::serve(proxy_listener, Self::proxy_router(self.state.clone()))
            .with_graceful_shutdown(wait_for(shutdown.resubscribe()));
        let web = axum::serve(web_listener, Self::web_router(self.state))
            .with_graceful_shutdown(wait_for(shutdown));

        let served = tokio::try_join!(async { proxy.await }, async { web.await });

        // A listener failure leaves no shutdown signal for the hub.
        if served.is_err() {
            hub.abort();
        }
        match hub.await {
            Err(e) if !e.is_cancelled() => {
                tracing::error!(error = %e, "Broadcast hub task failed");
            }
            _ => {}
        }
        served?;

        tracing::info!("HTTP servers stopped");
        Ok(())
    }
}

/// Forward any request on the proxy listener.
async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ForwardError> {
    state.forwarder.forward(request).await
}
