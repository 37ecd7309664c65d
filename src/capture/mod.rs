//! Exchange capture subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder (successful round trip)
//!     → exchange.rs (immutable Exchange record)
//!     → store.rs (bounded FIFO, notifies hub)
//!     → /api/logs listing via filter.rs
//! ```

pub mod exchange;
pub mod filter;
pub mod store;

pub use exchange::Exchange;
pub use filter::{Filter, FilterParams};
pub use store::LogStore;
