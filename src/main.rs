#![forbid(unsafe_code)]

//! `tc-warden`: config-driven bandwidth limiter binary.
//!
//! Spawns the traffic-control agent, applies the configuration once, then
//! re-applies it whenever the file changes until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tc_warden::agent::spawner::LaunchConfig;
use tc_warden::app::{self, RunOptions};
use tc_warden::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "tc-warden", about = "Config-driven bandwidth limiter", version, long_about = None)]
struct Cli {
    /// Path to the TOML limit configuration.
    config: PathBuf,

    /// Network interface to shape; overrides `global.interface`.
    #[arg(long)]
    interface: Option<String>,

    /// Privilege-escalation launcher used to start the agent.
    #[arg(long)]
    launcher: Option<String>,

    /// Agent executable; defaults to `$TC`, then `eltrafico-tc`.
    #[arg(long)]
    agent: Option<String>,

    /// Do not read or log processes discovered by the agent.
    #[arg(long)]
    no_discovery: bool,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("tc-warden bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Io(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut launch = LaunchConfig::from_env();
    if let Some(launcher) = args.launcher {
        launch.launcher = launcher;
    }
    if let Some(agent) = args.agent {
        launch.agent = agent;
    }

    let mut options = RunOptions::new(args.config, launch);
    options.interface = args.interface;
    options.discovery = !args.no_discovery;

    app::run(options, shutdown_signal()).await?;
    info!("tc-warden shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
