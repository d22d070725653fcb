//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `camera-uploads-workspace`
//! and enable `desktop-shims` (keyring, SQLite settings, directory media
//! library) or plain `core` (host supplies every bridge) without wiring each
//! crate individually.

#[cfg(any(feature = "core", feature = "desktop-shims"))]
pub use core_service;
