//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs general limiter (per-IP, every route)
//!     → [session authentication, protected routes only]
//!     → rate_limit.rs login limiter (per-IP, login submission only)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before authentication so floods never reach the user store
//! - Denial is a normal outcome (429), never an error
//! - One lock per limiter; the two limiters never contend

pub mod rate_limit;

pub use rate_limit::{FixedWindowLimiter, RateLimitDecision, RateLimiters};
