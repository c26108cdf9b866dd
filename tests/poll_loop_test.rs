// Integration tests for the poll loop

mod common;

use common::{descriptor, event, snapshot, strings, ScriptedSource, StalledSource};
use pm_datadog::bridge::{Bridge, PollLoop, StatusAggregate};
use pm_datadog::telemetry::{Emission, RecordingTelemetry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn poller(interval: Duration) -> (PollLoop, Arc<RecordingTelemetry>) {
    let recorder = Arc::new(RecordingTelemetry::new());
    (PollLoop::new(recorder.clone(), interval), recorder)
}

fn gauges(emissions: &[Emission]) -> Vec<(String, f64, Vec<String>)> {
    emissions
        .iter()
        .filter_map(|emission| match emission {
            Emission::Gauge { name, value, tags } => Some((name.clone(), *value, tags.clone())),
            _ => None,
        })
        .collect()
}

fn gauge_value(emissions: &[Emission], name: &str, tag: &str) -> Option<f64> {
    gauges(emissions)
        .into_iter()
        .find(|(n, _, tags)| n == name && tags.iter().any(|t| t == tag))
        .map(|(_, value, _)| value)
}

#[test]
fn test_report_emits_per_process_and_aggregate_gauges() {
    let (poller, recorder) = poller(Duration::from_secs(1));

    poller.report(&[snapshot("api", "0", "online"), snapshot("api", "1", "online")]);

    let app = strings(&["application:api"]);
    let instance0 = strings(&["application:api", "instance:0"]);
    let instance1 = strings(&["application:api", "instance:1"]);

    assert_eq!(
        gauges(&recorder.emissions()),
        vec![
            ("pm2.processes.installed".to_string(), 2.0, Vec::new()),
            ("pm2.processes.cpu".to_string(), 1.5, instance0.clone()),
            ("pm2.processes.memory".to_string(), 2048.0, instance0.clone()),
            ("pm2.processes.restart_time".to_string(), 3.0, instance0),
            ("pm2.processes.cpu".to_string(), 1.5, instance1.clone()),
            ("pm2.processes.memory".to_string(), 2048.0, instance1.clone()),
            ("pm2.processes.restart_time".to_string(), 3.0, instance1),
            ("pm2.processes.online_rate".to_string(), 1.0, app.clone()),
            ("pm2.processes.not_online_rate".to_string(), 0.0, app.clone()),
            ("pm2.processes.online".to_string(), 2.0, app.clone()),
            ("pm2.processes.not_online".to_string(), 0.0, app),
        ]
    );
}

#[test]
fn test_mixed_statuses_per_application() {
    let (poller, recorder) = poller(Duration::from_secs(1));

    let aggregate = poller.report(&[
        snapshot("api", "0", "online"),
        snapshot("api", "1", "errored"),
        snapshot("api", "2", "online"),
        snapshot("api", "3", "stopping"),
        snapshot("worker", "0", "stopped"),
    ]);

    assert_eq!(aggregate.len(), 2);

    let emissions = recorder.emissions();
    let installed = gauges(&emissions)
        .into_iter()
        .find(|(name, _, _)| name == "pm2.processes.installed")
        .map(|(_, value, _)| value);
    assert_eq!(installed, Some(5.0));
    assert_eq!(gauge_value(&emissions, "pm2.processes.online_rate", "application:api"), Some(0.5));
    assert_eq!(gauge_value(&emissions, "pm2.processes.not_online_rate", "application:api"), Some(0.5));
    assert_eq!(gauge_value(&emissions, "pm2.processes.online", "application:api"), Some(2.0));
    assert_eq!(gauge_value(&emissions, "pm2.processes.not_online", "application:api"), Some(2.0));
    assert_eq!(gauge_value(&emissions, "pm2.processes.online_rate", "application:worker"), Some(0.0));
    assert_eq!(gauge_value(&emissions, "pm2.processes.not_online_rate", "application:worker"), Some(1.0));
}

#[test]
fn test_empty_list_reports_zero_installed() {
    let (poller, recorder) = poller(Duration::from_secs(1));

    let aggregate = poller.report(&[]);

    assert!(aggregate.is_empty());
    assert_eq!(
        gauges(&recorder.emissions()),
        vec![("pm2.processes.installed".to_string(), 0.0, Vec::new())]
    );
}

#[test]
fn test_zero_total_skips_rates() {
    let (poller, recorder) = poller(Duration::from_secs(1));

    let mut aggregate = StatusAggregate::new();
    aggregate.track("ghost");
    poller.report_aggregate(&aggregate);

    let emitted = gauges(&recorder.emissions());
    let names: Vec<&str> = emitted.iter().map(|(name, _, _)| name.as_str()).collect();
    assert_eq!(names, vec!["pm2.processes.online", "pm2.processes.not_online"]);
    assert!(emitted.iter().all(|(_, value, _)| !value.is_nan()));
}

#[tokio::test]
async fn test_poll_once_list_error_emits_nothing() {
    let (poller, recorder) = poller(Duration::from_secs(1));
    let source = ScriptedSource::new().with_list_error("daemon went away");

    assert!(poller.poll_once(&source).await.is_err());
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_poll_once_success() {
    let (poller, recorder) = poller(Duration::from_secs(1));
    let source = ScriptedSource::new().with_list(vec![snapshot("api", "0", "online")]);

    let aggregate = poller.poll_once(&source).await.unwrap();
    assert_eq!(aggregate.get("api").map(|c| c.online), Some(1));
    assert_eq!(recorder.len(), 1 + 3 + 4);
}

#[tokio::test]
async fn test_run_continues_after_list_error_and_stops_on_shutdown() {
    let (poller, recorder) = poller(Duration::from_millis(5));
    let source = ScriptedSource::new()
        .with_list_error("daemon went away")
        .with_list(vec![snapshot("api", "0", "online"), snapshot("api", "1", "online")]);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stop = async {
        while source.list_calls() < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        shutdown_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(poller.run(&source, shutdown_rx), stop);
    })
    .await
    .expect("poll loop did not stop");

    // The failed first cycle emitted nothing, so the second cycle comes first
    let emissions = recorder.emissions();
    assert_eq!(
        emissions[0],
        Emission::Gauge {
            name: "pm2.processes.installed".to_string(),
            value: 2.0,
            tags: Vec::new(),
        }
    );
    assert!(source.list_calls() >= 3);
}

#[tokio::test]
async fn test_run_does_not_poll_after_shutdown() {
    let (poller, recorder) = poller(Duration::from_millis(5));
    let source = ScriptedSource::new();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();
    poller.run(&source, shutdown_rx).await;

    assert_eq!(source.list_calls(), 0);
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_bridge_runs_both_flows() {
    let recorder = Arc::new(RecordingTelemetry::new());
    let source = Arc::new(
        ScriptedSource::new()
            .with_list(vec![snapshot("api", "0", "online")])
            .with_events(vec![event("start", 1000, descriptor("api", "online"))]),
    );

    let bridge = Bridge::new(source.clone(), recorder.clone(), Duration::from_millis(5));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stop = async {
        while source.list_calls() < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        shutdown_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(bridge.run(shutdown_rx), stop);
    })
    .await
    .expect("bridge did not stop");

    let emissions = recorder.emissions();
    assert!(emissions
        .iter()
        .any(|e| e.name() == "PM2 process 'api' was manually started"));
    assert!(emissions
        .iter()
        .any(|e| e.name() == "pm2.processes.installed"));
}

#[tokio::test]
async fn test_run_stops_while_list_query_is_stalled() {
    let (poller, recorder) = poller(Duration::from_millis(5));
    let source = StalledSource::new();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stop = async {
        while source.list_calls() < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(1), async {
        tokio::join!(poller.run(&source, shutdown_rx), stop);
    })
    .await
    .expect("poll loop did not stop during a stalled list query");

    assert_eq!(source.list_calls(), 1);
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_bridge_stops_with_stalled_source() {
    let recorder = Arc::new(RecordingTelemetry::new());
    let source = Arc::new(StalledSource::new());
    let bridge = Bridge::new(source.clone(), recorder.clone(), Duration::from_millis(5));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stop = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(1), async {
        tokio::join!(bridge.run(shutdown_rx), stop);
    })
    .await
    .expect("bridge did not stop during a stalled list query");

    assert!(recorder.is_empty());
}
