// Poll loop - periodic process list snapshot to gauges

use crate::bridge::shutdown_requested;
use crate::bridge::tags::{snapshot_tags, TagSet};
use crate::error::Result;
use crate::ipc::protocol::{Availability, ProcessSnapshot};
use crate::source::ProcessSource;
use crate::telemetry::Telemetry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub const METRIC_INSTALLED: &str = "pm2.processes.installed";
pub const METRIC_CPU: &str = "pm2.processes.cpu";
pub const METRIC_MEMORY: &str = "pm2.processes.memory";
pub const METRIC_RESTART_TIME: &str = "pm2.processes.restart_time";
pub const METRIC_ONLINE_RATE: &str = "pm2.processes.online_rate";
pub const METRIC_NOT_ONLINE_RATE: &str = "pm2.processes.not_online_rate";
pub const METRIC_ONLINE: &str = "pm2.processes.online";
pub const METRIC_NOT_ONLINE: &str = "pm2.processes.not_online";

/// Online / not-online counts for one application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub online: u64,
    pub not_online: u64,
}

impl StatusCounts {
    pub fn record(&mut self, availability: Availability) {
        match availability {
            Availability::Online => self.online += 1,
            Availability::NotOnline => self.not_online += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.online + self.not_online
    }

    /// `(online_rate, not_online_rate)`, or `None` when nothing was counted
    pub fn rates(&self) -> Option<(f64, f64)> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some((
            self.online as f64 / total as f64,
            self.not_online as f64 / total as f64,
        ))
    }
}

/// Per-application counts for a single poll cycle
#[derive(Debug, Clone, Default)]
pub struct StatusAggregate {
    apps: BTreeMap<String, StatusCounts>,
}

impl StatusAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure an application has an entry, counted or not
    pub fn track(&mut self, name: &str) -> &mut StatusCounts {
        self.apps.entry(name.to_string()).or_default()
    }

    pub fn record(&mut self, name: &str, availability: Availability) {
        self.track(name).record(availability);
    }

    pub fn get(&self, name: &str) -> Option<&StatusCounts> {
        self.apps.get(name)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Applications in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatusCounts)> {
        self.apps.iter().map(|(name, counts)| (name.as_str(), counts))
    }
}

/// Repeating snapshot of the whole process list
pub struct PollLoop {
    telemetry: Arc<dyn Telemetry>,
    interval: Duration,
}

impl PollLoop {
    pub fn new(telemetry: Arc<dyn Telemetry>, interval: Duration) -> Self {
        Self {
            telemetry,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll, report, sleep; repeat until shutdown.
    ///
    /// The delay is measured from the end of each cycle. A failed list query
    /// skips the cycle. Shutdown is observed while a cycle is in flight as
    /// well as during the sleep.
    pub async fn run(&self, source: &dyn ProcessSource, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting poll loop (interval: {}ms)",
            self.interval.as_millis()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Shutdown also interrupts a list query that never answers
            tokio::select! {
                result = self.poll_once(source) => {
                    if let Err(e) = result {
                        error!("Failed to list processes, skipping cycle: {}", e);
                    }
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        debug!("Poll loop stopped");
    }

    /// Run a single cycle. List errors are returned before anything is emitted.
    pub async fn poll_once(&self, source: &dyn ProcessSource) -> Result<StatusAggregate> {
        let processes = source.list().await?;
        Ok(self.report(&processes))
    }

    /// Emit gauges for a process list and return the aggregate it produced
    pub fn report(&self, processes: &[ProcessSnapshot]) -> StatusAggregate {
        debug!("Reporting {} process(es)", processes.len());

        self.telemetry
            .gauge(METRIC_INSTALLED, processes.len() as f64, &[]);

        let mut aggregate = StatusAggregate::new();
        for process in processes {
            let tags = snapshot_tags(process).into_vec();

            self.telemetry.gauge(METRIC_CPU, process.monit.cpu, &tags);
            self.telemetry
                .gauge(METRIC_MEMORY, process.monit.memory as f64, &tags);
            self.telemetry.gauge(
                METRIC_RESTART_TIME,
                process.pm2_env.restart_time as f64,
                &tags,
            );

            aggregate.record(&process.name, process.availability());
        }

        self.report_aggregate(&aggregate);
        aggregate
    }

    /// Emit rate and count gauges per application.
    ///
    /// Rates are skipped for an application with no counted processes.
    pub fn report_aggregate(&self, aggregate: &StatusAggregate) {
        for (name, counts) in aggregate.iter() {
            let tags = TagSet::for_application(name).into_vec();

            match counts.rates() {
                Some((online_rate, not_online_rate)) => {
                    self.telemetry.gauge(METRIC_ONLINE_RATE, online_rate, &tags);
                    self.telemetry
                        .gauge(METRIC_NOT_ONLINE_RATE, not_online_rate, &tags);
                }
                None => debug!("No processes counted for '{}', skipping rates", name),
            }

            self.telemetry
                .gauge(METRIC_ONLINE, counts.online as f64, &tags);
            self.telemetry
                .gauge(METRIC_NOT_ONLINE, counts.not_online as f64, &tags);
        }
    }
}
