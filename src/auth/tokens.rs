//! Login and token validation.

use crate::error::{Result, StoreError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Authentication configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token lifetime in seconds. Zero means tokens never expire and no
    /// sweeper is started.
    pub token_ttl_secs: u64,

    /// Known users and their passwords.
    pub users: HashMap<String, String>,
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Option<Duration> {
        (self.token_ttl_secs > 0).then(|| Duration::from_secs(self.token_ttl_secs))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let users = [
            ("James", "Holden"),
            ("Julia", "Roberts"),
            ("Antonio", "Banderos"),
            ("Olga", "Buzova"),
            ("Courtney", "Love"),
        ]
        .into_iter()
        .map(|(u, p)| (u.to_string(), p.to_string()))
        .collect();

        Self {
            token_ttl_secs: 60,
            users,
        }
    }
}

/// Login/validate surface consumed by the gateway.
pub trait Authenticator: Send + Sync {
    /// Exchange a user/password pair for a token.
    fn login(&self, user: &str, password: &str) -> Result<String>;

    /// Check that `token` was issued to `user` and has not expired.
    fn validate(&self, user: &str, token: &str) -> Result<()>;
}

/// Issued token.
#[derive(Clone, Debug)]
struct TokenEntry {
    user: String,
    created: Instant,
}

/// In-memory token issuer.
pub struct TokenAuthority {
    /// Read-only after construction.
    users: HashMap<String, String>,
    tokens: RwLock<HashMap<String, TokenEntry>>,
    ttl: Option<Duration>,
}

impl TokenAuthority {
    pub fn new(config: AuthConfig) -> Self {
        let ttl = config.token_ttl();
        Self {
            users: config.users,
            tokens: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Build with an explicit TTL, for sub-second lifetimes.
    pub fn with_ttl(users: HashMap<String, String>, ttl: Option<Duration>) -> Self {
        Self {
            users,
            tokens: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Number of tokens currently held, expired or not.
    pub fn token_count(&self) -> usize {
        self.tokens.read().len()
    }

    /// Drop every token older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = match self.ttl {
            Some(ttl) => ttl,
            None => return 0,
        };

        let mut tokens = self.tokens.write();
        let before = tokens.len();
        tokens.retain(|_, entry| entry.created.elapsed() <= ttl);
        let purged = before - tokens.len();

        if purged > 0 {
            tracing::debug!(purged, "expired tokens purged");
        }
        purged
    }

    fn is_expired(&self, entry: &TokenEntry) -> bool {
        self.ttl
            .map_or(false, |ttl| entry.created.elapsed() > ttl)
    }
}

impl Authenticator for TokenAuthority {
    fn login(&self, user: &str, password: &str) -> Result<String> {
        tracing::trace!(user, "login");

        match self.users.get(user) {
            Some(expected) if expected == password => {}
            _ => {
                tracing::warn!(user, "login failed");
                return Err(StoreError::Unauthenticated(
                    "wrong login+password pair".into(),
                ));
            }
        }

        let token = Uuid::new_v4().to_string();
        self.tokens.write().insert(
            token.clone(),
            TokenEntry {
                user: user.to_string(),
                created: Instant::now(),
            },
        );

        tracing::info!(user, "login successful");
        Ok(token)
    }

    fn validate(&self, user: &str, token: &str) -> Result<()> {
        tracing::trace!(user, "validate");

        let tokens = self.tokens.read();
        match tokens.get(token) {
            Some(entry) if entry.user == user && !self.is_expired(entry) => {
                tracing::debug!(user, "validate successful");
                Ok(())
            }
            _ => {
                tracing::warn!(user, "validate failed");
                Err(StoreError::Unauthenticated("wrong login+token pair".into()))
            }
        }
    }
}
