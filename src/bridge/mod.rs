// Bridge module - event listener and poll loop sharing one telemetry client

pub mod listener;
pub mod poller;
pub mod tags;

pub use listener::EventListener;
pub use poller::{PollLoop, StatusAggregate, StatusCounts};
pub use tags::TagSet;

use crate::source::ProcessSource;
use crate::telemetry::Telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Resolves once shutdown has been requested or the sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}

/// Both control flows wired to one source and one telemetry client
pub struct Bridge {
    source: Arc<dyn ProcessSource>,
    listener: EventListener,
    poller: PollLoop,
}

impl Bridge {
    pub fn new(
        source: Arc<dyn ProcessSource>,
        telemetry: Arc<dyn Telemetry>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            listener: EventListener::new(Arc::clone(&telemetry)),
            poller: PollLoop::new(telemetry, interval),
        }
    }

    /// Run the listener and the poll loop on the current task until shutdown.
    ///
    /// A failed subscription is logged and leaves the poll loop running.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let listen = async {
            if let Err(e) = self
                .listener
                .run(self.source.as_ref(), shutdown.clone())
                .await
            {
                error!("Failed to subscribe to process events: {}", e);
            }
        };
        let poll = self.poller.run(self.source.as_ref(), shutdown.clone());

        tokio::join!(listen, poll);
        info!("Bridge stopped");
    }
}
