// DogStatsD client - fire-and-forget UDP emission

use crate::error::{BridgeError, Result};
use crate::telemetry::codec;
use crate::telemetry::{CheckOptions, CheckStatus, EventOptions, Telemetry};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

/// Callback invoked for every failed send
pub type ErrorHandler = Arc<dyn Fn(&std::io::Error) + Send + Sync>;

/// UDP DogStatsD client shared by the listener and the poll loop
pub struct DogStatsd {
    socket: UdpSocket,
    target: SocketAddr,
    global_tags: Vec<String>,
    on_error: ErrorHandler,
}

impl DogStatsd {
    /// Resolve the agent address and open a non-blocking UDP socket towards it
    pub fn connect(host: &str, port: u16, global_tags: Vec<String>) -> Result<Self> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                BridgeError::Telemetry(format!("Failed to resolve {}:{}: {}", host, port, e))
            })?
            .next()
            .ok_or_else(|| {
                BridgeError::Telemetry(format!("No address found for {}:{}", host, port))
            })?;

        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        socket.connect(target)?;

        Ok(Self {
            socket,
            target,
            global_tags,
            on_error: Arc::new(|error| {
                tracing::error!(error = %error, "Error reporting to DogStatsd");
            }),
        })
    }

    /// Replace the transport error callback
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.on_error = handler;
        self
    }

    /// Address datagrams are sent to
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Global tags appended to every emission
    pub fn global_tags(&self) -> &[String] {
        &self.global_tags
    }

    fn merge_tags<'a>(&'a self, tags: &'a [String]) -> Vec<&'a str> {
        tags.iter()
            .chain(self.global_tags.iter())
            .map(String::as_str)
            .collect()
    }

    fn send(&self, datagram: String) {
        tracing::trace!(datagram = %datagram, "Sending datagram");
        if let Err(e) = self.socket.send(datagram.as_bytes()) {
            (self.on_error)(&e);
        }
    }
}

impl Telemetry for DogStatsd {
    fn event(&self, title: &str, text: Option<&str>, options: &EventOptions, tags: &[String]) {
        let tags = self.merge_tags(tags);
        self.send(codec::encode_event(title, text, options, &tags));
    }

    fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        let tags = self.merge_tags(tags);
        self.send(codec::encode_gauge(name, value, &tags));
    }

    fn timing(&self, name: &str, millis: u64, tags: &[String]) {
        let tags = self.merge_tags(tags);
        self.send(codec::encode_timing(name, millis, &tags));
    }

    fn check(&self, name: &str, status: CheckStatus, options: &CheckOptions, tags: &[String]) {
        let tags = self.merge_tags(tags);
        self.send(codec::encode_check(name, status, options, &tags));
    }
}
