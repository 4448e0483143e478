//! Configuration management for the control panel
//!
//! This module provides three layers:
//! - **schema**: config document shape and the built-in profile defaults
//! - **store**: path-addressed mutation with subscriber notification
//! - **bridge**: merge-over-defaults loading and fire-and-forget saving

pub mod bridge;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use bridge::PersistenceBridge;
pub use schema::{AppConfig, ProfileName, ProfileSettings, VisualSettings};
pub use store::{ConfigStore, StoreError, SubscriptionId};
