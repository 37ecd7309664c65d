//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! proxy listener
//!     → server.rs proxy_handler → proxy::Forwarder
//!
//! web listener
//!     → middleware/cors.rs (pre-flight answered here)
//!     → api.rs (/api/logs, /api/logs/clear, /api/status)
//!     → websocket.rs (/api/ws live feed)
//!     → static UI directory (optional fallback)
//! ```

pub mod api;
pub mod middleware;
pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
