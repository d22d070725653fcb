//! # Authentication Module
//!
//! Turns the persisted session token into an active remote session.
//!
//! ## Overview
//!
//! The upload job never runs an interactive sign-in. The host app logs the
//! user in and persists a session token through [`SessionTokenStore`]; each
//! background run then exchanges that token for a session with
//! [`AuthManager::authenticate`].
//!
//! A missing or blank token fails fast with [`AuthError::NotLoggedIn`]
//! without any remote call.

pub mod error;
pub mod manager;
pub mod token_store;

pub use error::{AuthError, Result};
pub use manager::AuthManager;
pub use token_store::{SessionToken, SessionTokenStore};
