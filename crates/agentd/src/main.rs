// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! preflight-agentd: the background process that owns one agent's schedule
//! loop and control socket.
//!
//! Architecture:
//! - IPC listener task: accepts control-plane connections, dispatches
//!   status/stop/approve requests against the running agent.
//! - Scheduler task (owned by the agent): fires reconcile cycles on
//!   schedule.
//!
//! Concrete providers are out of scope here — this binary is generic over
//! whatever `Provider` set its caller supplies, empty by default, the same
//! way the engine it was built from is generic over its adapters.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;

use std::fs;
use std::sync::Arc;

use config::Config;
use preflight_agent::Agent;
use preflight_core::{CompileContext, Provider, Schedule, SequentialIdGen, SystemClock};
use preflight_engine::Cycle;
use preflight_ipc::{Handlers, IpcServer};
use preflight_policy::{ApprovalStore, RemediationPolicy};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

/// No manifest is loaded here — manifest parsing is handled upstream of
/// this binary. Providers compiled against this context always see an
/// empty section map.
struct EmptyCompileContext;

impl CompileContext for EmptyCompileContext {
    fn get_section(&self, _name: &str) -> Option<&serde_json::Value> {
        None
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("preflight-agentd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("preflight-agentd {}", env!("CARGO_PKG_VERSION"));
                println!("Background reconciliation agent. Talks to clients over a Unix socket.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: preflight-agentd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let _log_guard = setup_logging(&config)?;
    info!("starting preflight-agentd");

    let server = match IpcServer::start(&config.socket_path, &config.lock_path) {
        Ok(server) => server,
        Err(preflight_ipc::IpcError::LockFailed(path, _)) => {
            let pid = fs::read_to_string(&config.lock_path).unwrap_or_default();
            eprintln!("preflight-agentd is already running");
            if !pid.trim().is_empty() {
                eprintln!("  pid: {}", pid.trim());
            }
            eprintln!("  lock: {}", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start: {e}");
            return Err(e.into());
        }
    };
    fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    let providers: Vec<Box<dyn Provider>> = Vec::new();
    let cycle = Arc::new(Cycle::new(
        providers,
        RemediationPolicy::Auto,
        Arc::new(ApprovalStore::default()),
        Arc::new(SystemClock),
        Arc::new(SequentialIdGen::new("drift")),
    ));
    let agent = Arc::new(Agent::new(
        cycle,
        Arc::new(EmptyCompileContext),
        Schedule::interval(std::time::Duration::from_secs(300))?,
        Arc::new(SystemClock),
    ));
    agent.start().await?;

    let handlers = Arc::new(Handlers {
        agent: Arc::clone(&agent),
        approvals: Arc::new(ApprovalStore::default()),
        clock: Arc::new(SystemClock),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pid: std::process::id(),
    });

    let shutdown = Arc::new(Notify::new());
    let serve_handle = tokio::spawn(preflight_ipc::IpcServer::serve(server, Arc::clone(&handlers), Arc::clone(&shutdown)));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("ready, listening on {}", config.socket_path.display());
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    shutdown.notify_waiters();
    let _ = serve_handle.await;
    agent.stop().await;
    info!("preflight-agentd stopped");
    Ok(())
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or("state dir has no parent")?,
        config.log_path.file_name().ok_or("log path has no file name")?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
