//! Application-wide constants
//!
//! This module contains the magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Persisted configuration document constants
pub mod config {
    /// Application directory under the user config root
    pub const APP_DIR: &str = "panel-config";

    /// Persisted document filename
    pub const FILENAME: &str = "config.json";

    /// Indentation unit for the persisted document (four spaces)
    pub const JSON_INDENT: &[u8] = b"    ";
}

/// Unix socket constants for panel ↔ host communication
pub mod socket {
    /// Runtime directory holding the host socket
    pub const RUNTIME_DIR: &str = "panel-config";

    /// Socket filename within the runtime directory
    pub const FILENAME: &str = "host.sock";
}
