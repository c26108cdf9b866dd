// IPC module - Communication with the process manager daemon

pub mod client;
pub mod protocol;

pub use client::IpcClient;
pub use protocol::{
    Availability, Command, LifecycleEvent, Monit, ProcessDescriptor, ProcessEvent,
    ProcessSnapshot, Request, Response, ResponseData, SnapshotEnv, Versioning,
};
