// IPC Protocol definitions for bridge <-> process manager communication

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle event kinds published on the process manager's bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// App was deleted from the process manager
    Delete,
    /// App exited
    Exit,
    /// App was restarted, either manually or after a crash
    Restart,
    /// App exceeded its restart limit
    RestartOverlimit,
    /// App was manually started
    Start,
    /// App was manually stopped
    Stop,
    /// Anything else the bus emits
    Unknown(String),
}

impl LifecycleEvent {
    pub fn parse(event: &str) -> Self {
        match event {
            "delete" => LifecycleEvent::Delete,
            "exit" => LifecycleEvent::Exit,
            "restart" => LifecycleEvent::Restart,
            "restart overlimit" => LifecycleEvent::RestartOverlimit,
            "start" => LifecycleEvent::Start,
            "stop" => LifecycleEvent::Stop,
            other => LifecycleEvent::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LifecycleEvent::Delete => "delete",
            LifecycleEvent::Exit => "exit",
            LifecycleEvent::Restart => "restart",
            LifecycleEvent::RestartOverlimit => "restart overlimit",
            LifecycleEvent::Start => "start",
            LifecycleEvent::Stop => "stop",
            LifecycleEvent::Unknown(other) => other,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary availability used by the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Online,
    NotOnline,
}

impl Availability {
    /// Exact match on "online"; every other status is NotOnline
    pub fn from_status(status: &str) -> Self {
        if status == "online" {
            Availability::Online
        } else {
            Availability::NotOnline
        }
    }
}

/// Version control information attached to a process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioning {
    #[serde(default)]
    pub branch: Option<String>,
}

/// Process descriptor carried by a lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub name: String,

    /// Working directory of the app
    #[serde(default)]
    pub pm_cwd: Option<String>,

    #[serde(
        rename = "NODE_APP_INSTANCE",
        default,
        deserialize_with = "deserialize_instance"
    )]
    pub instance: Option<String>,

    /// Start time of the current run, in milliseconds since the epoch
    #[serde(default)]
    pub pm_uptime: u64,

    #[serde(default)]
    pub restart_time: u64,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub exit_code: Option<i64>,

    #[serde(default)]
    pub versioning: Option<Versioning>,
}

/// A message received on the lifecycle bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEvent {
    /// Event time in milliseconds since the epoch
    pub at: u64,
    pub event: String,
    pub process: ProcessDescriptor,
}

impl ProcessEvent {
    pub fn kind(&self) -> LifecycleEvent {
        LifecycleEvent::parse(&self.event)
    }
}

/// Resource usage of a listed process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Monit {
    /// CPU usage in percent
    #[serde(default)]
    pub cpu: f64,
    /// Resident memory in bytes
    #[serde(default)]
    pub memory: u64,
}

/// Environment section of a listed process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotEnv {
    #[serde(
        rename = "NODE_APP_INSTANCE",
        default,
        deserialize_with = "deserialize_instance"
    )]
    pub instance: Option<String>,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub restart_time: u64,
}

/// One entry of the process list query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub name: String,
    #[serde(default)]
    pub pm_id: Option<u64>,
    #[serde(default)]
    pub monit: Monit,
    #[serde(default)]
    pub pm2_env: SnapshotEnv,
}

impl ProcessSnapshot {
    pub fn availability(&self) -> Availability {
        Availability::from_status(&self.pm2_env.status)
    }
}

/// Commands understood by the process manager daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// Full process list
    List,
    /// Turn this connection into a lifecycle event stream
    Subscribe,
}

/// Response data variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseData {
    ProcessList(Vec<ProcessSnapshot>),
    /// Subscription accepted; bus messages follow on the same connection
    Subscribed,
}

/// Request message from bridge to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub command: Command,
}

/// Response message from daemon to bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Result<ResponseData, String>,
}

impl Request {
    pub fn new(id: u64, command: Command) -> Self {
        Self { id, command }
    }
}

impl Response {
    pub fn success(id: u64, data: ResponseData) -> Self {
        Self {
            id,
            result: Ok(data),
        }
    }

    pub fn error(id: u64, error: String) -> Self {
        Self {
            id,
            result: Err(error),
        }
    }
}

/// Instance ids arrive either as numbers or as strings
fn deserialize_instance<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawInstance {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<RawInstance>::deserialize(deserializer)? {
        Some(RawInstance::Text(text)) => Some(text),
        Some(RawInstance::Number(number)) => Some(number.to_string()),
        None => None,
    })
}
