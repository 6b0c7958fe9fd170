//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     latch → gateway stops accepting → drains → snapshot saved
//!               → stream client disconnects
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, StopToken};
pub use signals::wait_for_signal;
