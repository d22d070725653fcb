use bridge_traits::{RemoteError, RemoteErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No usable session token is persisted. Purely local, the remote
    /// service is never contacted.
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Remote login failed: {0}")]
    LoginFailed(RemoteError),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),
}

impl AuthError {
    /// Whether retrying on a later run may succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::NotLoggedIn => false,
            AuthError::LoginFailed(err) => err.code != RemoteErrorCode::Access,
            AuthError::SecureStorageUnavailable(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
