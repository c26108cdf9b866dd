// Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use pm_datadog::error::{BridgeError, Result};
use pm_datadog::ipc::{Monit, ProcessDescriptor, ProcessEvent, ProcessSnapshot, SnapshotEnv};
use pm_datadog::source::{EventStream, ProcessSource};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Process source that replays scripted list results and a fixed set of events
#[derive(Default)]
pub struct ScriptedSource {
    lists: Mutex<VecDeque<Result<Vec<ProcessSnapshot>>>>,
    events: Vec<ProcessEvent>,
    fail_subscribe: bool,
    list_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, processes: Vec<ProcessSnapshot>) -> Self {
        self.push(Ok(processes));
        self
    }

    pub fn with_list_error(self, message: &str) -> Self {
        self.push(Err(BridgeError::IpcError(message.to_string())));
        self
    }

    pub fn with_events(mut self, events: Vec<ProcessEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn push(&self, result: Result<Vec<ProcessSnapshot>>) {
        self.lists.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl ProcessSource for ScriptedSource {
    /// Scripted results in order, then empty lists
    async fn list(&self) -> Result<Vec<ProcessSnapshot>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// All events are queued up front; the stream ends after the last one
    async fn subscribe(&self) -> Result<EventStream> {
        if self.fail_subscribe {
            return Err(BridgeError::DaemonNotRunning);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for event in &self.events {
            tx.send(event.clone()).unwrap();
        }
        Ok(rx)
    }
}

/// Process source whose list query never answers and whose bus stays silent
#[derive(Default)]
pub struct StalledSource {
    list_calls: AtomicUsize,
}

impl StalledSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessSource for StalledSource {
    async fn list(&self) -> Result<Vec<ProcessSnapshot>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn subscribe(&self) -> Result<EventStream> {
        std::future::pending().await
    }
}

pub fn descriptor(name: &str, status: &str) -> ProcessDescriptor {
    ProcessDescriptor {
        name: name.to_string(),
        pm_cwd: None,
        instance: Some("0".to_string()),
        pm_uptime: 1000,
        restart_time: 0,
        status: status.to_string(),
        exit_code: None,
        versioning: None,
    }
}

pub fn event(kind: &str, at: u64, process: ProcessDescriptor) -> ProcessEvent {
    ProcessEvent {
        at,
        event: kind.to_string(),
        process,
    }
}

pub fn snapshot(name: &str, instance: &str, status: &str) -> ProcessSnapshot {
    ProcessSnapshot {
        name: name.to_string(),
        pm_id: None,
        monit: Monit {
            cpu: 1.5,
            memory: 2048,
        },
        pm2_env: SnapshotEnv {
            instance: Some(instance.to_string()),
            status: status.to_string(),
            restart_time: 3,
        },
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
