//! User store boundary.
//!
//! The panel's relational storage lives outside this crate; request handling
//! only needs id lookups and credential checks. [`InMemoryUserStore`] backs
//! the server with accounts seeded from configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::password;
use crate::config::UserAccount;

pub type UserId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
}

impl From<&UserAccount> for User {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            password_hash: account.password_hash.clone(),
        }
    }
}

/// Infrastructure failure of the store. "Not found" is never an error.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

pub trait UserStore: Send + Sync {
    fn resolve(&self, id: UserId) -> Result<Option<User>, StoreError>;

    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Cheap reachability check for readiness probes.
    fn ping(&self) -> Result<(), StoreError>;
}

/// Check a username/password pair.
///
/// `Ok(None)` covers both unknown usernames and wrong passwords; only store
/// outages surface as `Err`. Unknown usernames still pay one Argon2
/// verification so response time does not reveal which accounts exist.
pub fn verify_credentials(
    store: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<Option<User>, StoreError> {
    let Some(user) = store.find_by_username(username)? else {
        if let Some(hash) = absent_user_hash() {
            let _ = password::verify_password(password, hash);
        }
        return Ok(None);
    };

    match password::verify_password(password, &user.password_hash) {
        Ok(true) => Ok(Some(user)),
        Ok(false) => Ok(None),
        Err(e) => {
            tracing::error!(user_id = user.id, error = %e, "Stored password hash is unusable");
            Ok(None)
        }
    }
}

/// Hash verified against when the username is unknown. Computed once, at the
/// default cost.
fn absent_user_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| password::hash_password("absent-user").ok())
        .as_deref()
}

#[derive(Debug)]
pub struct InMemoryUserStore {
    users: DashMap<UserId, User>,
    available: AtomicBool,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    pub fn from_accounts(accounts: &[UserAccount]) -> Self {
        let store = Self::new();
        for account in accounts {
            store.insert(User::from(account));
        }
        store
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&self, id: UserId) -> Option<User> {
        self.users.remove(&id).map(|(_, user)| user)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Simulate the backing database going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store is offline".to_string()))
        }
    }
}

impl UserStore for InMemoryUserStore {
    fn resolve(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .users
            .iter()
            .find(|r| r.value().username == username)
            .map(|r| r.value().clone()))
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }
}
