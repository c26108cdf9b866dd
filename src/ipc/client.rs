// IPC Client - Talks to the process manager daemon via Unix socket

use crate::error::{BridgeError, Result};
use crate::ipc::protocol::{Command, ProcessEvent, ProcessSnapshot, Request, Response, ResponseData};
use crate::source::{EventStream, ProcessSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

/// Default socket path of the process manager daemon.
///
/// The daemon must speak the `List`/`Subscribe` protocol in `ipc::protocol`.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/pm-datadog.sock";

/// IPC client for the process manager daemon
pub struct IpcClient {
    socket_path: PathBuf,
    request_id: AtomicU64,
}

impl IpcClient {
    /// Create a new IPC client with the default socket path
    pub fn new() -> Self {
        Self::with_socket_path(DEFAULT_SOCKET_PATH)
    }

    /// Create a new IPC client with a custom socket path
    pub fn with_socket_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            socket_path: path.as_ref().to_path_buf(),
            request_id: AtomicU64::new(1),
        }
    }

    /// Send a command and wait for its response.
    ///
    /// Returns the response payload together with the connection, which stays
    /// open so streaming commands can keep reading from it.
    async fn send_command(
        &self,
        command: Command,
    ) -> Result<(ResponseData, BufReader<UnixStream>)> {
        let request_id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(request_id, command);

        let mut stream = self.connect().await?;

        let request_json = serde_json::to_string(&request).map_err(|e| {
            BridgeError::SerializationError(format!("Failed to serialize request: {}", e))
        })?;

        // Newline-delimited frames
        stream
            .write_all(format!("{}\n", request_json).as_bytes())
            .await
            .map_err(|e| BridgeError::IpcError(format!("Failed to write request: {}", e)))?;

        stream
            .flush()
            .await
            .map_err(|e| BridgeError::IpcError(format!("Failed to flush stream: {}", e)))?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        let read = reader
            .read_line(&mut response_line)
            .await
            .map_err(|e| BridgeError::IpcError(format!("Failed to read response: {}", e)))?;

        if read == 0 {
            return Err(BridgeError::IpcError(
                "Connection closed before a response was received".to_string(),
            ));
        }

        let response: Response = serde_json::from_str(&response_line).map_err(|e| {
            BridgeError::DeserializationError(format!("Failed to deserialize response: {}", e))
        })?;

        if response.id != request_id {
            return Err(BridgeError::ProtocolError(format!(
                "Response ID mismatch: expected {}, got {}",
                request_id, response.id
            )));
        }

        let data = response.result.map_err(BridgeError::Rejected)?;
        Ok((data, reader))
    }

    /// Establish a connection to the daemon's Unix socket
    async fn connect(&self) -> Result<UnixStream> {
        if !self.socket_path.exists() {
            return Err(BridgeError::DaemonNotRunning);
        }

        UnixStream::connect(&self.socket_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused
                || e.kind() == std::io::ErrorKind::NotFound
            {
                BridgeError::DaemonNotRunning
            } else {
                BridgeError::ConnectionError(format!("Failed to connect to daemon: {}", e))
            }
        })
    }

    /// Get the socket path being used
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSource for IpcClient {
    async fn list(&self) -> Result<Vec<ProcessSnapshot>> {
        match self.send_command(Command::List).await? {
            (ResponseData::ProcessList(processes), _) => Ok(processes),
            (other, _) => Err(BridgeError::ProtocolError(format!(
                "Unexpected response to List: {:?}",
                other
            ))),
        }
    }

    async fn subscribe(&self) -> Result<EventStream> {
        let reader = match self.send_command(Command::Subscribe).await? {
            (ResponseData::Subscribed, reader) => reader,
            (other, _) => {
                return Err(BridgeError::ProtocolError(format!(
                    "Unexpected response to Subscribe: {:?}",
                    other
                )))
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_events(reader, tx));
        Ok(rx)
    }
}

/// Read bus messages off the connection until it closes.
///
/// Lines that are not valid UTF-8 or JSON are skipped; only EOF or an I/O
/// error ends the subscription.
async fn forward_events(mut reader: BufReader<UnixStream>, tx: UnboundedSender<ProcessEvent>) {
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                debug!("Event bus connection closed");
                break;
            }
            Ok(_) => {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }

                match serde_json::from_slice::<ProcessEvent>(&line) {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            debug!("Event receiver dropped, closing subscription");
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping malformed bus message: {}", e),
                }
            }
            Err(e) => {
                warn!("Failed to read from event bus: {}", e);
                break;
            }
        }
    }
}
