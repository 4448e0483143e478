//! Request servicing for the host daemon
//!
//! Owns the persisted config document on disk and answers panel requests:
//! loads are answered inline, saves are applied in arrival order without a
//! reply, and window chrome signals are forwarded to the embedding shell
//! as [`HostEvent`]s.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info, warn};

use crate::constants;
use crate::host::{HostRequest, HostResponse, HostServer};

/// Signals the daemon surfaces to whoever embeds it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Panel asked for its window to be closed
    CloseRequested,
    /// Panel asked for its window to be minimized
    MinimizeRequested,
    /// Panel asked the host to shut down
    Shutdown,
}

/// Get default config document path (~/.config/panel-config/config.json)
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(constants::config::APP_DIR);
    path.push(constants::config::FILENAME);
    path
}

/// Disk I/O and event forwarding for one daemon instance
pub struct HostService {
    config_path: PathBuf,
    events: mpsc::Sender<HostEvent>,
}

impl HostService {
    pub fn new(config_path: PathBuf, events: mpsc::Sender<HostEvent>) -> Self {
        Self {
            config_path,
            events,
        }
    }

    /// Read the persisted document
    ///
    /// Missing, unreadable, or corrupt files all read as an empty document;
    /// the panel fills in defaults on its side.
    pub fn read_document(&self) -> Map<String, Value> {
        let contents = match std::fs::read(&self.config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.config_path.display(), "No persisted config yet");
                return Map::new();
            }
            Err(e) => {
                error!(path = %self.config_path.display(), error = %e, "Failed to read config file");
                return Map::new();
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(document) => document,
            Err(e) => {
                error!(path = %self.config_path.display(), error = %e, "Config file is not a JSON object, treating as empty");
                Map::new()
            }
        }
    }

    /// Overwrite the persisted document on disk
    pub fn write_document(&self, document: &Value) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }

        let rendered = render_document(document)?;
        std::fs::write(&self.config_path, rendered).context(format!(
            "Failed to write config file to {}",
            self.config_path.display()
        ))?;
        Ok(())
    }

    fn forward(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            warn!(event = ?event, "No consumer for host events (shutting down?)");
        }
    }
}

/// Render the document with four-space indentation
fn render_document(document: &Value) -> Result<Vec<u8>> {
    let formatter = PrettyFormatter::with_indent(constants::config::JSON_INDENT);
    let mut rendered = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut rendered, formatter);
    document
        .serialize(&mut serializer)
        .context("Failed to serialize config document")?;
    Ok(rendered)
}

/// Spawn the daemon's accept loop on its own thread
pub fn spawn_listener(server: HostServer, service: HostService) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = run_service_loop(&server, &service) {
            error!(error = ?e, "Host service loop crashed");
        }
    })
}

/// Serve panel connections until a shutdown request arrives
fn run_service_loop(server: &HostServer, service: &HostService) -> Result<()> {
    info!(socket = %server.path().display(), "Host service listening");

    loop {
        let mut conn = server.accept().context("Failed to accept panel connection")?;
        info!("Panel connected");

        loop {
            match conn.recv_request() {
                Ok(HostRequest::LoadConfig) => {
                    debug!("Panel requested persisted config");
                    let document = service.read_document();
                    conn.send_response(&HostResponse::Config(document))?;
                }
                Ok(HostRequest::SaveConfig(document)) => {
                    // No reply; the panel does not wait for saves
                    if let Err(e) = service.write_document(&document) {
                        error!(error = ?e, "Failed to persist config document");
                    }
                }
                Ok(HostRequest::Close) => {
                    debug!("Panel requested window close");
                    service.forward(HostEvent::CloseRequested);
                }
                Ok(HostRequest::Minimize) => {
                    debug!("Panel requested window minimize");
                    service.forward(HostEvent::MinimizeRequested);
                }
                Ok(HostRequest::Ping) => {
                    conn.send_response(&HostResponse::Pong)?;
                }
                Ok(HostRequest::Shutdown) => {
                    info!("Received shutdown request");
                    service.forward(HostEvent::Shutdown);
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "Panel connection closed or errored");
                    break;
                }
            }
        }

        info!("Panel disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostClient, HostTransport, SocketTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn service_with(dir: &tempfile::TempDir) -> (HostService, mpsc::Receiver<HostEvent>) {
        let (tx, rx) = mpsc::channel();
        (HostService::new(dir.path().join("config.json"), tx), rx)
    }

    #[test]
    fn test_read_document_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let (service, _rx) = service_with(&dir);

        assert!(service.read_document().is_empty());
    }

    #[test]
    fn test_read_document_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), b"{ not json").unwrap();
        let (service, _rx) = service_with(&dir);

        assert!(service.read_document().is_empty());
    }

    #[test]
    fn test_read_document_non_object_is_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), b"[1, 2, 3]").unwrap();
        let (service, _rx) = service_with(&dir);

        assert!(service.read_document().is_empty());
    }

    #[test]
    fn test_write_document_uses_four_space_indent() {
        let dir = tempdir().unwrap();
        let (service, _rx) = service_with(&dir);

        service
            .write_document(&json!({ "visuals": { "enabled": true } }))
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(written.starts_with("{\n    \"visuals\""));
        assert!(written.contains("\n        \"enabled\": true"));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let (service, _rx) = service_with(&dir);
        let document = json!({ "profile": "semi", "baudRate": 115200 });

        service.write_document(&document).unwrap();

        assert_eq!(Value::Object(service.read_document()), document);
    }

    #[test]
    fn test_write_document_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = mpsc::channel();
        let service = HostService::new(dir.path().join("nested/panel/config.json"), tx);

        service.write_document(&json!({})).unwrap();

        assert!(dir.path().join("nested/panel/config.json").exists());
    }

    #[test]
    fn test_service_loop_end_to_end() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("host.sock");
        let (tx, rx) = mpsc::channel();

        let server = HostServer::bind_to(socket_path.clone()).unwrap();
        let service = HostService::new(dir.path().join("config.json"), tx);
        let handle = spawn_listener(server, service);

        let transport = SocketTransport::connect_to(&socket_path).unwrap();

        // Nothing persisted yet
        assert!(transport.load_config().unwrap().is_empty());

        // Save, then read back through the same boundary
        let document = json!({ "profile": "rage", "debugMode": false });
        transport.save_config(&document).unwrap();
        assert_eq!(Value::Object(transport.load_config().unwrap()), document);

        // Window signals surface as events
        transport.request_close().unwrap();
        transport.request_minimize().unwrap();
        assert_eq!(rx.recv().unwrap(), HostEvent::CloseRequested);
        assert_eq!(rx.recv().unwrap(), HostEvent::MinimizeRequested);
        drop(transport);

        // Shutdown stops the loop and releases the socket
        let mut client = HostClient::connect_to(&socket_path).unwrap();
        client.send_request(&HostRequest::Shutdown).unwrap();
        assert_eq!(rx.recv().unwrap(), HostEvent::Shutdown);
        handle.join().unwrap();
        assert!(!socket_path.exists());
    }
}
