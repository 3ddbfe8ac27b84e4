//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities, windows, intervals > 0)
//! - Check account integrity (unique ids and usernames, parseable hashes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PanelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::auth::password;
use crate::config::schema::PanelConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("session.cookie_name must not be empty")]
    EmptyCookieName,

    #[error("duplicate user id {0}")]
    DuplicateUserId(i64),

    #[error("duplicate username `{0}`")]
    DuplicateUsername(String),

    #[error("user `{0}` has a malformed password hash")]
    MalformedPasswordHash(String),
}

pub fn validate_config(config: &PanelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let limits = &config.rate_limit;
    if limits.requests_per_window == 0 {
        errors.push(ValidationError::Zero("rate_limit.requests_per_window"));
    }
    if limits.login_attempts == 0 {
        errors.push(ValidationError::Zero("rate_limit.login_attempts"));
    }
    if limits.window_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.window_secs"));
    }
    if limits.login_window_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.login_window_secs"));
    }

    if config.monitoring.interval_secs == 0 {
        errors.push(ValidationError::Zero("monitoring.interval_secs"));
    }
    if config.monitoring.retention == 0 {
        errors.push(ValidationError::Zero("monitoring.retention"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for account in &config.users {
        if !ids.insert(account.id) {
            errors.push(ValidationError::DuplicateUserId(account.id));
        }
        if !names.insert(account.username.as_str()) {
            errors.push(ValidationError::DuplicateUsername(account.username.clone()));
        }
        if !password::is_valid_hash(&account.password_hash) {
            errors.push(ValidationError::MalformedPasswordHash(
                account.username.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::schema::UserAccount;

    const HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaGhhc2hoYXNo";

    fn account(id: i64, username: &str, hash: &str) -> UserAccount {
        UserAccount {
            id,
            username: username.to_string(),
            password_hash: hash.to_string(),
            role: Role::Admin,
            email: String::new(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&PanelConfig::default()).is_ok());
    }

    #[test]
    fn rejects_bad_bind_address() {
        let mut config = PanelConfig::default();
        config.listener.bind_address = "localhost".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidBindAddress("localhost".to_string())]
        );
    }

    #[test]
    fn metrics_address_only_checked_when_enabled() {
        let mut config = PanelConfig::default();
        config.observability.metrics_address = "nope".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn reports_every_account_problem() {
        let mut config = PanelConfig::default();
        config.users = vec![
            account(1, "admin", HASH),
            account(1, "admin", HASH),
            account(2, "ops", "plaintext"),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateUserId(1)));
        assert!(errors.contains(&ValidationError::DuplicateUsername("admin".to_string())));
        assert!(errors.contains(&ValidationError::MalformedPasswordHash("ops".to_string())));
    }

    #[test]
    fn zero_monitoring_values_rejected() {
        let mut config = PanelConfig::default();
        config.monitoring.interval_secs = 0;
        config.monitoring.retention = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn zero_login_window_rejected() {
        let mut config = PanelConfig::default();
        config.rate_limit.login_window_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Zero("rate_limit.login_window_secs")]);
    }
}
