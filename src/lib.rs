// Library exports for the pm-datadog bridge

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod source;
pub mod telemetry;
