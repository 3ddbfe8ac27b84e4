//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build state → Start background tasks → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Server drains, cleanup and sampler exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Background tasks are started explicitly once, never lazily
//! - Background tasks get a bounded grace period, then are abandoned

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
