//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::any;
use axum::Router;
use http_debug_proxy::http::AppState;
use http_debug_proxy::{HttpServer, ProxyConfig, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Start a mock upstream that echoes the request body and every `x-test`
/// header, replying with the status named in `x-status` (default 200).
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(request: Request<Body>) -> Response<Body> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

        let status = parts
            .headers
            .get("x-status")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(200);

        let mut builder = Response::builder()
            .status(status)
            .header("x-echo-path", parts.uri.path());
        for value in parts.headers.get_all("x-test") {
            builder = builder.header("x-test", value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running proxy bound to ephemeral ports.
#[allow(dead_code)]
pub struct TestProxy {
    pub proxy: SocketAddr,
    pub web: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    pub task: JoinHandle<std::io::Result<()>>,
}

#[allow(dead_code)]
impl TestProxy {
    pub async fn start(upstream: SocketAddr, configure: impl FnOnce(&mut ProxyConfig)) -> Self {
        let mut config = ProxyConfig::default();
        config.upstream.target_url = format!("http://{}", upstream);
        configure(&mut config);

        let proxy_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let web_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy = proxy_listener.local_addr().unwrap();
        let web = web_listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server = HttpServer::new(config);
        let state = server.state();
        let server_shutdown = shutdown.subscribe();
        let task = tokio::spawn(async move {
            server.run(proxy_listener, web_listener, server_shutdown).await
        });

        Self {
            proxy,
            web,
            state,
            shutdown,
            task,
        }
    }

    pub fn proxy_url(&self, path: &str) -> String {
        format!("http://{}{}", self.proxy, path)
    }

    pub fn web_url(&self, path: &str) -> String {
        format!("http://{}{}", self.web, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/api/ws", self.web)
    }

    /// Poll the status endpoint until the hub reports `expected` observers.
    pub async fn wait_for_observers(&self, expected: u64) {
        let client = client();
        for _ in 0..100 {
            let report: serde_json::Value = client
                .get(self.web_url("/api/status"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if report["observers"].as_u64() == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("hub never reached {} observers", expected);
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
