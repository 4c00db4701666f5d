//! Outreach-Oxide: human-like browser outreach automation
//!
//! This library drives a professional-networking site through the Chrome
//! DevTools Protocol: it restores or establishes a session, searches for
//! profiles, sends connection requests and follows up once a request is
//! accepted. Every irreversible action passes a daily quota and an activity
//! window, and every input event is shaped by behavioral models.

pub mod error;
pub mod config;

pub mod driver;
pub mod policy;
pub mod stealth;
pub mod store;
pub mod workflow;

// Re-exports
pub use error::{Error, Result};

/// Outreach-Oxide library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
