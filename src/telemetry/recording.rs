// In-memory telemetry sink

use crate::telemetry::{CheckOptions, CheckStatus, EventOptions, Telemetry};
use std::sync::Mutex;

/// One captured emission
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Event {
        title: String,
        text: Option<String>,
        options: EventOptions,
        tags: Vec<String>,
    },
    Gauge {
        name: String,
        value: f64,
        tags: Vec<String>,
    },
    Timing {
        name: String,
        millis: u64,
        tags: Vec<String>,
    },
    Check {
        name: String,
        status: CheckStatus,
        options: CheckOptions,
        tags: Vec<String>,
    },
}

impl Emission {
    /// Short label for the emission type
    pub fn kind(&self) -> &'static str {
        match self {
            Emission::Event { .. } => "event",
            Emission::Gauge { .. } => "gauge",
            Emission::Timing { .. } => "timing",
            Emission::Check { .. } => "check",
        }
    }

    /// Metric, check name or event title
    pub fn name(&self) -> &str {
        match self {
            Emission::Event { title, .. } => title,
            Emission::Gauge { name, .. }
            | Emission::Timing { name, .. }
            | Emission::Check { name, .. } => name,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Emission::Event { tags, .. }
            | Emission::Gauge { tags, .. }
            | Emission::Timing { tags, .. }
            | Emission::Check { tags, .. } => tags,
        }
    }
}

/// Telemetry sink that keeps every emission in memory
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    emissions: Mutex<Vec<Emission>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn emissions(&self) -> Vec<Emission> {
        self.lock().clone()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<Emission> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn record(&self, emission: Emission) {
        self.lock().push(emission);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Emission>> {
        // A poisoned lock still holds valid emissions
        self.emissions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Telemetry for RecordingTelemetry {
    fn event(&self, title: &str, text: Option<&str>, options: &EventOptions, tags: &[String]) {
        self.record(Emission::Event {
            title: title.to_string(),
            text: text.map(str::to_string),
            options: options.clone(),
            tags: tags.to_vec(),
        });
    }

    fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        self.record(Emission::Gauge {
            name: name.to_string(),
            value,
            tags: tags.to_vec(),
        });
    }

    fn timing(&self, name: &str, millis: u64, tags: &[String]) {
        self.record(Emission::Timing {
            name: name.to_string(),
            millis,
            tags: tags.to_vec(),
        });
    }

    fn check(&self, name: &str, status: CheckStatus, options: &CheckOptions, tags: &[String]) {
        self.record(Emission::Check {
            name: name.to_string(),
            status,
            options: options.clone(),
            tags: tags.to_vec(),
        });
    }
}
