//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the camera-upload core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - The completion bridge that turns callback-driven remote operations
//!   into awaitable results
//!
//! Every other core crate depends on this one for its logging conventions,
//! its `CoreConfig`, and its way of talking to the remote SDK.

pub mod completion;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use completion::{CompletionBridge, CompletionSlot};
pub use error::{Error, Result};
