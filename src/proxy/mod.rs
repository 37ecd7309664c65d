//! Proxy forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request (proxy listener)
//!     → forwarder.rs (buffer body, replay against upstream, deadline)
//!     → upstream response returned verbatim
//!     → Exchange appended to the LogStore
//! ```
//!
//! Failures map to `error.rs` statuses (500/502) and record nothing.

pub mod error;
pub mod forwarder;

pub use error::ForwardError;
pub use forwarder::Forwarder;
