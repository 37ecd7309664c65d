//! Live exchange feed.
//!
//! # Data Flow
//! ```text
//! LogStore::append
//!     → HubHandle::publish (non-blocking, drops when inbox full)
//!     → hub.rs coordinator (sole owner of the observer set)
//!     → each observer's bounded queue (full queue = observer disconnected)
//!     → connection.rs write loop → JSON text frame
//! ```

pub mod connection;
pub mod error;
pub mod hub;
pub mod message;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use error::ChannelError;
pub use hub::{BroadcastHub, HubHandle, Subscriber};
pub use message::BroadcastMessage;
