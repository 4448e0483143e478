//! Persistence plumbing between the store and the host process
//!
//! Loading and saving are deliberately asymmetric: load is a one-shot
//! request/response whose result is merged over the built-in defaults, save
//! is fire-and-forget. Neither ever surfaces an error to the editing user;
//! failures degrade to "defaults" or "in-memory only" and are logged.

use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::config::schema::AppConfig;
use crate::host::{connect_or_null, HostTransport, NullTransport};

/// Merge a persisted document over the defaults, one level deep
///
/// Top-level keys from the persisted document replace the default entry
/// wholesale; nested fields are not reconciled. A persisted `legit` section
/// missing `rcs` therefore yields a merged `legit` without `rcs` at all.
/// Earlier builds shipped with this merge and existing files depend on it,
/// so it must stay shallow. A merged document that no longer decodes is
/// treated the same as a missing one.
pub fn merge_over_defaults(persisted: Map<String, Value>) -> AppConfig {
    let defaults = AppConfig::default();
    if persisted.is_empty() {
        return defaults;
    }

    let mut merged = match serde_json::to_value(&defaults) {
        Ok(Value::Object(map)) => map,
        _ => return defaults,
    };
    for (key, value) in persisted {
        merged.insert(key, value);
    }

    match serde_json::from_value(Value::Object(merged)) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Persisted config does not decode, falling back to defaults");
            AppConfig::default()
        }
    }
}

/// Store-facing side of the host boundary
///
/// Owns the transport and applies the merge and failure policy, so the
/// store itself never branches on whether a host is present.
pub struct PersistenceBridge {
    transport: Box<dyn HostTransport>,
}

impl PersistenceBridge {
    pub fn new(transport: Box<dyn HostTransport>) -> Self {
        Self { transport }
    }

    /// Bridge over a live host connection, degrading to detached mode when
    /// the host socket is unreachable
    pub fn connect() -> Self {
        Self::new(connect_or_null())
    }

    /// Bridge with no host at all (development runs, tests)
    pub fn detached() -> Self {
        Self::new(Box::new(NullTransport))
    }

    /// Fetch the persisted document and merge it over the defaults
    ///
    /// Any transport or decode failure yields the plain defaults.
    pub fn fetch_merged(&self) -> AppConfig {
        let persisted = match self.transport.load_config() {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "Could not load persisted config, starting from defaults");
                Map::new()
            }
        };
        merge_over_defaults(persisted)
    }

    /// Hand the current document to the host for durable storage
    ///
    /// Fire-and-forget: failures are logged and the in-memory state stays
    /// authoritative for the rest of the session.
    pub fn submit(&self, config: &AppConfig) {
        let document = match serde_json::to_value(config) {
            Ok(document) => document,
            Err(e) => {
                error!(error = %e, "Failed to serialize config for persistence");
                return;
            }
        };
        if let Err(e) = self.transport.save_config(&document) {
            warn!(error = %e, "Failed to hand config to host, edit is in-memory only");
        }
    }

    pub fn request_close(&self) {
        if let Err(e) = self.transport.request_close() {
            warn!(error = %e, "Failed to forward close request to host");
        }
    }

    pub fn request_minimize(&self) {
        if let Err(e) = self.transport.request_minimize() {
            warn!(error = %e, "Failed to forward minimize request to host");
        }
    }
}
