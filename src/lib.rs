#![forbid(unsafe_code)]

//! Hierarchical configuration store shared between a control panel and the
//! privileged host process that persists it
//!
//! The panel side embeds a [`ConfigStore`]: path-addressed edits over a
//! typed document with three tuning profiles, synchronous subscriber
//! notification, and fire-and-forget persistence through a
//! [`HostTransport`]. The host side (`panel-hostd`) owns the document on
//! disk and serves loads, saves, and window chrome signals over a Unix
//! socket.

pub mod config;
pub mod constants;
pub mod host;

pub use config::{
    AppConfig, ConfigStore, PersistenceBridge, ProfileName, ProfileSettings, StoreError,
    SubscriptionId, VisualSettings,
};
pub use host::{connect_or_null, HostTransport, NullTransport, SocketTransport};
