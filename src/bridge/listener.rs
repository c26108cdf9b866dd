// Event listener - maps lifecycle events to telemetry

use crate::bridge::shutdown_requested;
use crate::bridge::tags::{event_tags, TagSet};
use crate::error::Result;
use crate::ipc::protocol::{LifecycleEvent, ProcessEvent};
use crate::source::ProcessSource;
use crate::telemetry::{AlertType, CheckOptions, CheckStatus, EventOptions, Telemetry};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Service check reported for lifecycle transitions
pub const CHECK_APP_IS_OK: &str = "app.is_ok";

/// Timing of the run that just ended
pub const METRIC_UPTIME: &str = "pm2.processes.uptime";

/// Restart count reported on restart
pub const METRIC_RESTART: &str = "pm2.processes.restart";

/// Translates bus events into events, metrics and checks
pub struct EventListener {
    telemetry: Arc<dyn Telemetry>,
}

impl EventListener {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self { telemetry }
    }

    /// Subscribe once and handle events until the bus closes or shutdown fires.
    ///
    /// Only a failed subscription is returned as an error; the subscription is
    /// never retried.
    pub async fn run(
        &self,
        source: &dyn ProcessSource,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut events = tokio::select! {
            subscribed = source.subscribe() => subscribed?,
            _ = shutdown_requested(&mut shutdown) => {
                debug!("Event listener shutting down before subscription completed");
                return Ok(());
            }
        };
        info!("PM2 connection established");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(&event),
                    None => {
                        warn!("Event bus closed, event listener stopping");
                        return Ok(());
                    }
                },
                _ = shutdown_requested(&mut shutdown) => {
                    debug!("Event listener shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Handle one event using the current wall clock
    pub fn handle(&self, event: &ProcessEvent) {
        let now = epoch_millis(chrono::Utc::now().timestamp_millis());
        self.handle_at(event, now);
    }

    /// Handle one event; `now` is milliseconds since the epoch
    pub fn handle_at(&self, event: &ProcessEvent, now: u64) {
        let process = &event.process;

        info!(
            "Received event '{}' with status '{}'",
            event.event, process.status
        );

        let kind = event.kind();
        if let LifecycleEvent::Unknown(other) = &kind {
            debug!("Ignoring unhandled event '{}'", other);
            return;
        }

        let name = &process.name;
        let tags = event_tags(process).into_vec();
        let check_tags = TagSet::for_application(name).into_vec();
        let aggregation_key = format!("{}-{}", name, process.pm_uptime);
        let check_options = CheckOptions {
            date_happened: Some(event.at),
        };
        let event_options = |alert_type: Option<AlertType>, aggregation_key: Option<String>| {
            EventOptions {
                date_happened: Some(event.at),
                aggregation_key,
                alert_type,
            }
        };

        match kind {
            LifecycleEvent::Delete => {
                self.telemetry.event(
                    &format!("PM2 process '{}' was deleted", name),
                    None,
                    &event_options(None, None),
                    &tags,
                );
            }

            LifecycleEvent::Exit => {
                self.telemetry.event(
                    &format!("PM2 process '{}' is {}", name, process.status),
                    None,
                    &event_options(Some(AlertType::Warning), Some(aggregation_key)),
                    &tags,
                );
                self.telemetry
                    .timing(METRIC_UPTIME, now.saturating_sub(process.pm_uptime), &tags);

                // A missing exit code counts as a failure
                if process.exit_code != Some(0) {
                    self.telemetry.check(
                        CHECK_APP_IS_OK,
                        CheckStatus::Critical,
                        &check_options,
                        &check_tags,
                    );
                }
            }

            LifecycleEvent::Restart => {
                self.telemetry.event(
                    &format!("PM2 process '{}' was restarted", name),
                    None,
                    &event_options(Some(AlertType::Success), None),
                    &tags,
                );
                self.telemetry
                    .check(CHECK_APP_IS_OK, CheckStatus::Ok, &check_options, &check_tags);
                self.telemetry
                    .gauge(METRIC_RESTART, process.restart_time as f64, &tags);
            }

            LifecycleEvent::RestartOverlimit => {
                self.telemetry.event(
                    &format!("PM2 process '{}' has exceeded the restart limit", name),
                    None,
                    &event_options(Some(AlertType::Error), Some(aggregation_key)),
                    &tags,
                );
            }

            LifecycleEvent::Start => {
                self.telemetry.event(
                    &format!("PM2 process '{}' was manually started", name),
                    None,
                    &event_options(Some(AlertType::Success), None),
                    &tags,
                );
                self.telemetry
                    .check(CHECK_APP_IS_OK, CheckStatus::Ok, &check_options, &check_tags);
            }

            LifecycleEvent::Stop => {
                self.telemetry.event(
                    &format!("PM2 process '{}' was manually stopped", name),
                    None,
                    &event_options(Some(AlertType::Error), None),
                    &tags,
                );
                self.telemetry.check(
                    CHECK_APP_IS_OK,
                    CheckStatus::Warning,
                    &check_options,
                    &check_tags,
                );
            }

            LifecycleEvent::Unknown(_) => {}
        }
    }
}

/// Clock reading as unsigned milliseconds; a pre-epoch clock reads as 0
fn epoch_millis(millis: i64) -> u64 {
    u64::try_from(millis).unwrap_or_else(|_| {
        debug!("System clock is before the epoch ({}ms), using 0", millis);
        0
    })
}
