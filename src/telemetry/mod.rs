// Telemetry module - DogStatsD-style emission primitives

pub mod codec;
pub mod dogstatsd;
pub mod recording;

pub use dogstatsd::DogStatsd;
pub use recording::{Emission, RecordingTelemetry};

/// Severity attached to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    Info,
    Warning,
    Error,
    Success,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Info => "info",
            AlertType::Warning => "warning",
            AlertType::Error => "error",
            AlertType::Success => "success",
        }
    }
}

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl CheckStatus {
    /// Numeric code on the wire
    pub fn code(&self) -> u8 {
        match self {
            CheckStatus::Ok => 0,
            CheckStatus::Warning => 1,
            CheckStatus::Critical => 2,
            CheckStatus::Unknown => 3,
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "OK"),
            CheckStatus::Warning => write!(f, "WARNING"),
            CheckStatus::Critical => write!(f, "CRITICAL"),
            CheckStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Optional event fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOptions {
    /// Milliseconds since the epoch
    pub date_happened: Option<u64>,
    pub aggregation_key: Option<String>,
    pub alert_type: Option<AlertType>,
}

/// Optional service check fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Milliseconds since the epoch
    pub date_happened: Option<u64>,
}

/// Sink for metrics, events and service checks.
///
/// Every call is fire-and-forget: implementations report their own transport
/// failures and never hand them back to the caller.
pub trait Telemetry: Send + Sync {
    fn event(&self, title: &str, text: Option<&str>, options: &EventOptions, tags: &[String]);

    fn gauge(&self, name: &str, value: f64, tags: &[String]);

    fn timing(&self, name: &str, millis: u64, tags: &[String]);

    fn check(&self, name: &str, status: CheckStatus, options: &CheckOptions, tags: &[String]);
}
