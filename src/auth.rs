use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::store::{KvStore, StoreError, Subscription};

pub const USERS_DB_KEY: &str = "trendai-users-db";
pub const SESSION_KEY: &str = "trendai-user-session";

const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

/// The session-facing identity. Written to the session key on login/signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

/// Directory entry keyed by email. The credential is stored in plain
/// comparable form under the historical `passwordHash` field name; see
/// DESIGN.md for the open question around hardening this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("A user with this email already exists.")]
    DuplicateUser,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mock authentication over the persisted store: an email-keyed user
/// directory plus a single session slot, both shared with any other context
/// using the same storage medium.
#[derive(Clone)]
pub struct AuthService {
    store: KvStore,
    latency: Duration,
}

impl AuthService {
    pub fn new(store: KvStore) -> Self {
        Self::with_latency(store, DEFAULT_LATENCY)
    }

    /// `latency` is an artificial delay applied to login and signup so the
    /// interactive flow feels like a real backend round trip. Tests pass
    /// `Duration::ZERO`.
    pub fn with_latency(store: KvStore, latency: Duration) -> Self {
        Self { store, latency }
    }

    fn directory(&self) -> HashMap<String, UserRecord> {
        self.store.get(USERS_DB_KEY).unwrap_or_default()
    }

    /// Whether the email is unknown or the credential mismatched is not
    /// observable from the outside; both are the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        sleep(self.latency).await;
        let users = self.directory();
        let record = users
            .get(email)
            .filter(|record| record.password_hash == password)
            .ok_or(AuthError::InvalidCredentials)?;
        let user = User {
            id: record.id.clone(),
            email: Some(record.email.clone()),
        };
        self.store.set(SESSION_KEY, &user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        sleep(self.latency).await;
        let mut users = self.directory();
        if users.contains_key(email) {
            return Err(AuthError::DuplicateUser);
        }
        let id = format!("user-{}", Utc::now().timestamp_millis());
        users.insert(
            email.to_string(),
            UserRecord {
                id: id.clone(),
                email: email.to_string(),
                password_hash: password.to_string(),
            },
        );
        self.store.set(USERS_DB_KEY, &users)?;
        let user = User {
            id,
            email: Some(email.to_string()),
        };
        self.store.set(SESSION_KEY, &user)?;
        info!(user_id = %user.id, "user signed up");
        Ok(user)
    }

    /// Clears the session. Always succeeds from the caller's perspective; a
    /// storage failure is logged and the session treated as gone.
    pub fn logout(&self) {
        if let Err(err) = self.store.remove(SESSION_KEY) {
            warn!(error = %err, "could not clear session key");
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.store.get(SESSION_KEY)
    }

    /// Delivers the current session value immediately, then again whenever
    /// another context logs in or out against the same store.
    pub fn on_auth_state_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<User>) + Send + Sync + 'static,
    {
        self.store.subscribe(SESSION_KEY, callback)
    }
}
