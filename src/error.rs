use thiserror::Error;

/// Main error type for the pm-datadog bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Invalid global_tags: {0}")]
    InvalidGlobalTags(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // IPC-related errors
    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Failed to connect to process manager: {0}")]
    ConnectionError(String),

    #[error("IPC protocol error: {0}")]
    ProtocolError(String),

    #[error("Process manager daemon not running")]
    DaemonNotRunning,

    #[error("Process manager rejected request: {0}")]
    Rejected(String),

    // Telemetry errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
