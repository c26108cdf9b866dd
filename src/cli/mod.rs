// CLI module - entry point of the pm-datadog binary

mod output;

use crate::bridge::{Bridge, PollLoop};
use crate::config::{BridgeConfig, ConfigOverrides};
use crate::error::Result;
use crate::ipc::IpcClient;
use crate::logging::{init_logging, LogFormat};
use crate::source::ProcessSource;
use crate::telemetry::{DogStatsd, RecordingTelemetry, Telemetry};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};

/// pm-datadog - forwards process manager events and metrics to DogStatsD
#[derive(Parser)]
#[command(name = "pm-datadog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    options: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ConfigArgs {
    /// Config file (.toml or .json)
    #[arg(short, long, global = true, env = "PM_DATADOG_CONFIG")]
    config: Option<PathBuf>,

    /// Global tags as a JSON array, e.g. '["env:prod"]'
    #[arg(long, global = true, env = "PM_DATADOG_GLOBAL_TAGS")]
    global_tags: Option<String>,

    /// DogStatsD agent host
    #[arg(long, global = true, env = "PM_DATADOG_HOST")]
    host: Option<String>,

    /// DogStatsD agent port
    #[arg(long, global = true, env = "PM_DATADOG_PORT")]
    port: Option<u16>,

    /// Poll interval in milliseconds
    #[arg(long, global = true, env = "PM_DATADOG_INTERVAL")]
    interval: Option<u64>,

    /// Process manager daemon socket
    #[arg(long, global = true, env = "PM_DATADOG_SOCKET")]
    socket: Option<PathBuf>,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward events and metrics until interrupted (default)
    Run,

    /// Run one poll cycle and print what would be sent
    Snapshot,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        init_logging(self.options.log_format)?;

        let config = BridgeConfig::load(self.options.config.as_deref(), self.overrides())?;

        // Both flows share one cooperative thread
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        match self.command.as_ref().unwrap_or(&Commands::Run) {
            Commands::Run => runtime.block_on(run_bridge(config)),
            Commands::Snapshot => runtime.block_on(snapshot(config)),
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            global_tags: self.options.global_tags.clone(),
            host: self.options.host.clone(),
            port: self.options.port,
            interval: self.options.interval,
            socket: self.options.socket.clone(),
        }
    }
}

/// Forward until SIGINT or SIGTERM
async fn run_bridge(config: BridgeConfig) -> Result<()> {
    let global_tags = config.global_tags()?;

    info!(
        global_tags = ?global_tags,
        host = %config.host,
        interval = config.interval,
        port = config.port,
        "Starting pm-datadog"
    );

    let telemetry: Arc<dyn Telemetry> =
        Arc::new(DogStatsd::connect(&config.host, config.port, global_tags)?);
    let source: Arc<dyn ProcessSource> = Arc::new(IpcClient::with_socket_path(&config.socket));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    Bridge::new(source, telemetry, config.interval())
        .run(shutdown_rx)
        .await;

    Ok(())
}

/// One poll cycle against an in-memory sink, printed as a table
async fn snapshot(config: BridgeConfig) -> Result<()> {
    let recorder = Arc::new(RecordingTelemetry::new());
    let source = IpcClient::with_socket_path(&config.socket);

    let telemetry: Arc<dyn Telemetry> = Arc::clone(&recorder) as Arc<dyn Telemetry>;
    let poller = PollLoop::new(telemetry, config.interval());
    poller.poll_once(&source).await?;

    output::print_emissions(&recorder.take(), &config.global_tags()?);
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_signal() {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
