//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PanelConfig (validated, immutable)
//!     → CLI overrides applied once in main
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ListenerConfig, MonitoringConfig, ObservabilityConfig, PanelConfig, RateLimitConfig,
    SessionConfig, TimeoutConfig, TlsConfig, UserAccount,
};
pub use validation::{validate_config, ValidationError};
