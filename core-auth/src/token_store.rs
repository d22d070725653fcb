//! Session Token Storage
//!
//! Persists the remote session token through the host `SecureStore`.
//!
//! ## Security
//!
//! - The token value is never logged or included in error messages
//! - `SessionToken`'s `Debug` output is redacted
//! - Corrupted entries (not UTF-8) are deleted and treated as absent
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::SessionTokenStore;
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let store = SessionTokenStore::new(secure_store, "session_token");
//!
//! store.save("opaque-session").await?;
//! assert!(store.load().await?.is_some());
//! store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use bridge_traits::storage::SecureStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A non-blank session token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Secure storage for the session token under one fixed key.
#[derive(Clone)]
pub struct SessionTokenStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
}

impl SessionTokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        Self {
            secure_store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist a session token, overwriting any previous one.
    ///
    /// Blank tokens are rejected with `AuthError::NotLoggedIn` so that a
    /// later run cannot mistake them for a credential.
    pub async fn save(&self, token: &str) -> Result<()> {
        if SessionToken::parse(token).is_none() {
            return Err(AuthError::NotLoggedIn);
        }

        self.secure_store
            .set_secret(&self.key, token.as_bytes())
            .await
            .map_err(|e| {
                warn!(key = %self.key, error = %e, "Failed to store session token");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(key = %self.key, "Session token stored");
        Ok(())
    }

    /// Load the persisted token.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(token))` if a non-blank token is stored
    /// - `Ok(None)` if nothing is stored, the value is blank, or it was corrupted
    /// - `Err` if the secure store is unavailable
    pub async fn load(&self) -> Result<Option<SessionToken>> {
        let raw = self
            .secure_store
            .get_secret(&self.key)
            .await
            .map_err(|e| {
                warn!(key = %self.key, error = %e, "Failed to read session token");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(bytes) = raw else {
            debug!(key = %self.key, "No session token stored");
            return Ok(None);
        };

        match String::from_utf8(bytes) {
            Ok(value) => {
                let token = SessionToken::parse(value);
                if token.is_none() {
                    debug!(key = %self.key, "Stored session token is blank");
                }
                Ok(token)
            }
            Err(_) => {
                warn!(key = %self.key, "Stored session token is corrupted, deleting");
                if let Err(e) = self.secure_store.delete_secret(&self.key).await {
                    warn!(key = %self.key, error = %e, "Failed to delete corrupted session token");
                }
                Ok(None)
            }
        }
    }

    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.key)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;
        info!(key = %self.key, "Session token cleared");
        Ok(())
    }
}
