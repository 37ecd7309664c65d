//! HTTP debugging proxy library.
//!
//! Forwards traffic to one upstream, keeps a bounded history of captured
//! exchanges and streams new ones to live observers.

pub mod broadcast;
pub mod capture;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
