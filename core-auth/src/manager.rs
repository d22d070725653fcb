//! # Authentication Manager
//!
//! Exchanges the persisted session token for an active remote session.
//!
//! ## Overview
//!
//! `AuthManager` is the first remote step of every upload run. It reads the
//! token from [`SessionTokenStore`], fails fast when there is none, and
//! otherwise performs `login(token)` through the [`CompletionBridge`]. Every
//! state change is published on the [`EventBus`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::{AuthManager, SessionTokenStore};
//! use core_runtime::{events::EventBus, CompletionBridge};
//!
//! let manager = AuthManager::new(
//!     SessionTokenStore::new(secure_store, "session_token"),
//!     CompletionBridge::new(remote, Duration::from_secs(5)),
//!     EventBus::new(100),
//! );
//!
//! let session = manager.authenticate().await?;
//! ```

use crate::error::{AuthError, Result};
use crate::token_store::SessionTokenStore;
use bridge_traits::RemoteSession;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::CompletionBridge;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

/// Session lifecycle for one process.
pub struct AuthManager {
    token_store: SessionTokenStore,
    bridge: CompletionBridge,
    event_bus: EventBus,
    current_session: RwLock<Option<RemoteSession>>,
}

impl AuthManager {
    pub fn new(
        token_store: SessionTokenStore,
        bridge: CompletionBridge,
        event_bus: EventBus,
    ) -> Self {
        Self {
            token_store,
            bridge,
            event_bus,
            current_session: RwLock::new(None),
        }
    }

    pub fn token_store(&self) -> &SessionTokenStore {
        &self.token_store
    }

    /// Log in with the persisted session token.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotLoggedIn` if no non-blank token is stored; the remote
    ///   client is not called
    /// - `AuthError::SecureStorageUnavailable` if the token cannot be read
    /// - `AuthError::LoginFailed` if the remote side rejects the session
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<RemoteSession> {
        let token = match self.token_store.load().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                error!("No session token persisted, not logged in");
                self.emit_failure(&AuthError::NotLoggedIn);
                return Err(AuthError::NotLoggedIn);
            }
            Err(err) => {
                error!(error = %err, "Could not read session token");
                self.emit_failure(&err);
                return Err(err);
            }
        };

        self.emit(AuthEvent::SigningIn);

        let result = self
            .bridge
            .await_operation("login", |remote, listener| {
                remote.login(token.as_str(), listener)
            })
            .await;

        match result {
            Ok(session) => {
                info!(account_id = %session.account_id, "Signed in");
                *self.current_session.write().await = Some(session.clone());
                self.emit(AuthEvent::SignedIn {
                    account_id: session.account_id.clone(),
                });
                Ok(session)
            }
            Err(remote_error) => {
                let err = AuthError::LoginFailed(remote_error);
                error!(error = %err, "Remote login failed");
                *self.current_session.write().await = None;
                self.emit_failure(&err);
                Err(err)
            }
        }
    }

    /// The session established by the last successful `authenticate`.
    pub async fn current_session(&self) -> Option<RemoteSession> {
        self.current_session.read().await.clone()
    }

    /// Forget the active session and delete the persisted token.
    pub async fn sign_out(&self) -> Result<()> {
        *self.current_session.write().await = None;
        self.token_store.clear().await?;
        info!("Signed out");
        Ok(())
    }

    fn emit_failure(&self, err: &AuthError) {
        self.emit(AuthEvent::AuthError {
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        });
    }

    fn emit(&self, event: AuthEvent) {
        if self.event_bus.emit(CoreEvent::Auth(event)).is_err() {
            warn!("No subscribers for auth event");
        }
    }
}
