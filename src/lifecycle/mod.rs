//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build HttpServer → Bind listeners → Run
//!
//! Shutdown (shutdown.rs + signals.rs):
//!     Ctrl+C → Shutdown::trigger → hub stops (observers closed)
//!            → both listeners drain and exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
