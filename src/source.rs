// Process source - the seam between the bridge and the process manager

use crate::error::Result;
use crate::ipc::protocol::{ProcessEvent, ProcessSnapshot};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

/// Stream of lifecycle events; ends when the bus goes away
pub type EventStream = UnboundedReceiver<ProcessEvent>;

/// Anything that can answer the process list query and publish lifecycle events
#[async_trait]
pub trait ProcessSource: Send + Sync {
    /// Fetch the full process list
    async fn list(&self) -> Result<Vec<ProcessSnapshot>>;

    /// Subscribe to the lifecycle event bus
    async fn subscribe(&self) -> Result<EventStream>;
}
