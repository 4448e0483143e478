//! IPC message types for panel ↔ host communication

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Requests sent from the panel to the host process
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum HostRequest {
    /// Fetch the persisted config document (answered with `Config`)
    LoadConfig,

    /// Overwrite the persisted document wholesale. No reply is sent.
    SaveConfig(Value),

    /// Close the panel window. No reply is sent.
    Close,

    /// Minimize the panel window. No reply is sent.
    Minimize,

    /// Health check
    Ping,

    /// Request graceful host shutdown. No reply is sent.
    Shutdown,
}

/// Responses sent from the host process to the panel
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum HostResponse {
    /// Persisted document contents; empty when none exists yet
    Config(Map<String, Value>),

    /// Health check response
    Pong,

    /// Request could not be served
    Error(String),
}
