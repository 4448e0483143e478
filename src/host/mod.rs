//! IPC between the control panel and its privileged host process
//!
//! Provides message-based communication between the panel UI and the host
//! daemon that owns the persisted config document.
//! Uses length-prefixed JSON over Unix domain sockets.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

mod messages;
pub mod service;
pub use messages::{HostRequest, HostResponse};

use crate::constants;

/// Maximum message size (10 MB) to prevent DoS via memory exhaustion
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir)
            .join(constants::socket::RUNTIME_DIR)
            .join(constants::socket::FILENAME));
    }

    // Fallback to cache dir
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache
        .join(constants::socket::RUNTIME_DIR)
        .join(constants::socket::FILENAME))
}

/// Client connection to the host process (used by the panel)
pub struct HostClient {
    stream: UnixStream,
}

impl HostClient {
    /// Connect to the host socket at the default path
    pub fn connect() -> Result<Self> {
        let path = default_socket_path()?;
        Self::connect_to(&path)
    }

    /// Connect to a specific socket path
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to host at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Send request to the host
    pub fn send_request(&mut self, req: &HostRequest) -> Result<()> {
        write_message(&mut self.stream, req)
    }

    /// Receive response from the host (blocking)
    pub fn recv_response(&mut self) -> Result<HostResponse> {
        read_message(&mut self.stream)
    }

    /// Send request and wait for response (convenience method)
    pub fn request(&mut self, req: HostRequest) -> Result<HostResponse> {
        self.send_request(&req)?;
        self.recv_response()
    }
}

/// Server listener for the host process
pub struct HostServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl HostServer {
    /// Create server and bind to default socket path
    pub fn bind() -> Result<Self> {
        let socket_path = default_socket_path()?;
        Self::bind_to(socket_path)
    }

    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        // Create directory if needed
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Remove stale socket if exists
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        // Set permissions to 0700 (owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept incoming panel connection (blocking)
    pub fn accept(&self) -> Result<PanelConnection> {
        let (stream, _addr) = self
            .listener
            .accept()
            .context("Failed to accept IPC connection")?;
        Ok(PanelConnection { stream })
    }

    /// Get socket path
    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for HostServer {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Host-side handle for one accepted panel connection
pub struct PanelConnection {
    stream: UnixStream,
}

impl PanelConnection {
    /// Receive the panel's next request (blocking)
    pub fn recv_request(&mut self) -> Result<HostRequest> {
        read_message(&mut self.stream)
    }

    /// Send response back to the panel
    pub fn send_response(&mut self, resp: &HostResponse) -> Result<()> {
        write_message(&mut self.stream, resp)
    }
}

/// Capability surface the config layer expects from its host
///
/// The panel may run without a reachable host (e.g. during development
/// outside the privileged shell); [`NullTransport`] stands in so callers
/// never have to branch on availability.
pub trait HostTransport {
    /// Fetch the persisted config document (request/response, resolves once)
    fn load_config(&self) -> Result<Map<String, Value>>;

    /// Overwrite the persisted document
    ///
    /// Fire-and-forget: no acknowledgment is awaited. The host applies
    /// saves in arrival order, so the last call wins.
    fn save_config(&self, document: &Value) -> Result<()>;

    /// Ask the host to close the panel window
    fn request_close(&self) -> Result<()>;

    /// Ask the host to minimize the panel window
    fn request_minimize(&self) -> Result<()>;
}

/// [`HostTransport`] carried over the host's Unix socket
pub struct SocketTransport {
    client: Mutex<HostClient>,
}

impl SocketTransport {
    /// Connect to the host at the default socket path
    pub fn connect() -> Result<Self> {
        Ok(Self {
            client: Mutex::new(HostClient::connect()?),
        })
    }

    /// Connect to the host at a specific socket path
    pub fn connect_to(path: &Path) -> Result<Self> {
        Ok(Self {
            client: Mutex::new(HostClient::connect_to(path)?),
        })
    }
}

impl HostTransport for SocketTransport {
    fn load_config(&self) -> Result<Map<String, Value>> {
        let mut client = self.client.lock().unwrap();
        match client.request(HostRequest::LoadConfig)? {
            HostResponse::Config(document) => Ok(document),
            HostResponse::Error(msg) => Err(anyhow!("Host refused config load: {}", msg)),
            other => Err(anyhow!("Unexpected reply to config load: {:?}", other)),
        }
    }

    fn save_config(&self, document: &Value) -> Result<()> {
        // No reply is read back for saves
        let mut client = self.client.lock().unwrap();
        client.send_request(&HostRequest::SaveConfig(document.clone()))
    }

    fn request_close(&self) -> Result<()> {
        let mut client = self.client.lock().unwrap();
        client.send_request(&HostRequest::Close)
    }

    fn request_minimize(&self) -> Result<()> {
        let mut client = self.client.lock().unwrap();
        client.send_request(&HostRequest::Minimize)
    }
}

/// Stand-in transport for runs without a reachable host
///
/// Loads resolve to an empty document and saves are absorbed, so config
/// edits still work but stay in-memory.
pub struct NullTransport;

impl HostTransport for NullTransport {
    fn load_config(&self) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }

    fn save_config(&self, _document: &Value) -> Result<()> {
        Ok(())
    }

    fn request_close(&self) -> Result<()> {
        Ok(())
    }

    fn request_minimize(&self) -> Result<()> {
        Ok(())
    }
}

/// Connect to the host at the default socket, degrading to [`NullTransport`]
/// when it is unreachable
pub fn connect_or_null() -> Box<dyn HostTransport> {
    match SocketTransport::connect() {
        Ok(transport) => {
            info!("Connected to host process");
            Box::new(transport)
        }
        Err(e) => {
            warn!(error = %e, "Host not reachable, config edits will stay in-memory");
            Box::new(NullTransport)
        }
    }
}

/// Write length-prefixed message to stream
fn write_message<T: Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;

    // Write JSON payload
    stream
        .write_all(&json)
        .context("Failed to write message payload")?;

    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
fn read_message<T: for<'de> Deserialize<'de>>(stream: &mut UnixStream) -> Result<T> {
    // Read length prefix
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check (prevent DoS via huge allocation)
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!(
            "Message too large: {} bytes (max: {})",
            len,
            MAX_MESSAGE_SIZE
        ));
    }

    // Read JSON payload
    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    // Deserialize
    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_round_trip_over_socket_pair() {
        let (mut a, mut b) = UnixStream::pair().unwrap();

        write_message(&mut a, &HostRequest::SaveConfig(json!({ "debugMode": true }))).unwrap();
        match read_message::<HostRequest>(&mut b).unwrap() {
            HostRequest::SaveConfig(document) => {
                assert_eq!(document, json!({ "debugMode": true }));
            }
            other => panic!("unexpected request: {:?}", other),
        }

        write_message(&mut b, &HostResponse::Pong).unwrap();
        let reply = read_message::<HostResponse>(&mut a).unwrap();
        assert!(matches!(reply, HostResponse::Pong));
    }

    #[test]
    fn test_length_prefix_is_little_endian() {
        let (mut a, mut b) = UnixStream::pair().unwrap();

        write_message(&mut a, &HostRequest::Ping).unwrap();

        let mut prefix = [0u8; 4];
        b.read_exact(&mut prefix).unwrap();
        let len = u32::from_le_bytes(prefix) as usize;

        let mut payload = vec![0u8; len];
        b.read_exact(&mut payload).unwrap();
        let parsed: HostRequest = serde_json::from_slice(&payload).unwrap();
        assert!(matches!(parsed, HostRequest::Ping));
    }

    #[test]
    fn test_oversized_message_is_rejected() {
        let (mut a, mut b) = UnixStream::pair().unwrap();

        // Hand-write a length prefix past the cap; no payload follows
        let len = (MAX_MESSAGE_SIZE + 1) as u32;
        a.write_all(&len.to_le_bytes()).unwrap();
        a.flush().unwrap();

        let err = read_message::<HostResponse>(&mut b).unwrap_err();
        assert!(err.to_string().contains("Message too large"));
    }

    #[test]
    fn test_null_transport_absorbs_everything() {
        let transport = NullTransport;

        assert!(transport.load_config().unwrap().is_empty());
        transport.save_config(&json!({ "profile": "rage" })).unwrap();
        transport.request_close().unwrap();
        transport.request_minimize().unwrap();
    }
}
