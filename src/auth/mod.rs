//! Session authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header
//!     → session.rs (extract + parse `user_<id>`)
//!     → store.rs (resolve id against the user store)
//!     → middleware.rs (attach AuthenticatedIdentity or reject)
//!
//! Login form
//!     → store.rs verify_credentials (password.rs, Argon2id)
//!     → session.rs (issue cookie)
//! ```
//!
//! # Design Decisions
//! - Identity is request-scoped; nothing is cached between requests
//! - API paths get 401 JSON, pages get a redirect to /login
//! - Store outages are reported as 503, never as bad credentials

pub mod middleware;
pub mod password;
pub mod session;
pub mod store;

pub use middleware::{AuthFailure, AuthenticatedIdentity, Authenticator, CurrentUser};
pub use session::SessionToken;
pub use store::{verify_credentials, InMemoryUserStore, Role, StoreError, User, UserId, UserStore};
