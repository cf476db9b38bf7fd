//! Command implementations
//!
//! `route` runs in-process against the configured executors unless
//! `--via-daemon` is given; everything that touches shared state (plans,
//! gates, forks) goes through the daemon.

use crate::cli::{Commands, GateCommand, GitCommand, LedgerCommand, PlanCommand, RouteArgs};
use axial_core::config::AxialConfig;
use axial_core::{CreateGateRequest, Error, RouteOutcome};
use axial_gateway::{AxialService, DaemonClient};
use axial_router::Router;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run(command: Commands, config: AxialConfig) -> anyhow::Result<()> {
    let client = || DaemonClient::new(&config.daemon_url);

    match command {
        Commands::Route(args) => route(args, &config).await?,

        Commands::Git { command } => match command {
            GitCommand::Fork { id } => {
                let fork = client().fork(&id).await?;
                match &fork.location {
                    Some(location) => println!("Forked {} at {}", fork.id, location.display()),
                    None => println!("Forked {} ({})", fork.id, fork.backend),
                }
            }
            GitCommand::Close { id } => {
                let fork = client().close_fork(&id).await?;
                println!("Closed {}", fork.id);
            }
            GitCommand::List => print_json(&client().forks().await?)?,
        },

        Commands::Ui => launch_ui(&config)?,

        Commands::Daemon { port, bind, .. } => {
            let mut config = config.clone();
            if let Some(port) = port {
                config.daemon.port = port;
            }
            if let Some(bind) = bind {
                config.daemon.bind = bind;
            }
            daemon(config).await?;
        }

        Commands::Plan { command: PlanCommand::Submit { file, json } } => {
            let payload = read_plan(file.as_deref(), json.as_deref())?;
            print_json(&client().submit_plan(&payload).await?)?;
        }

        Commands::Approve { gate, reject } => {
            let response = client().approve(&gate, !reject).await?;
            println!("{} {}", response.gate.gate_id, response.gate.status);
        }

        Commands::Gate { command } => match command {
            GateCommand::Create { id, description } => {
                let request = CreateGateRequest { gate_id: id, description };
                print_json(&client().create_gate(&request).await?)?;
            }
            GateCommand::List { pending } => print_json(&client().gates(pending).await?)?,
            GateCommand::Wait { id, timeout_secs } => {
                let gate = client().wait_gate(&id, timeout_secs).await?;
                println!("{} {}", gate.gate_id, gate.status);
            }
        },

        Commands::Ledger { command } => match command {
            LedgerCommand::Verify => {
                let report = client().verify_ledger().await?;
                print_json(&report)?;
                if !report.valid {
                    return Err(Error::LedgerCorrupt("hash chain does not verify".into()).into());
                }
            }
            LedgerCommand::Export { out } => {
                let out = if out.is_absolute() { out } else { std::env::current_dir()?.join(out) };
                print_json(&client().export_ledger(&out).await?)?;
            }
            LedgerCommand::List { query } => print_json(&client().ledger(query.as_deref()).await?)?,
        },
    }
    Ok(())
}

async fn route(args: RouteArgs, config: &AxialConfig) -> anyhow::Result<()> {
    if args.dry_run {
        let router = Router::from_config(&config.router)?;
        let decision = router.decide(&args.task, args.strategy.as_deref())?;
        if args.explain {
            print_json(&decision)?;
        } else {
            println!("{}", decision.executor);
        }
        return Ok(());
    }

    let outcome: RouteOutcome = if args.via_daemon {
        DaemonClient::new(&config.daemon_url)
            .route(&args.task, args.strategy.as_deref())
            .await?
    } else {
        let router = Router::from_config(&config.router)?;
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        router
            .route_cancellable(&args.task, args.strategy.as_deref(), cancel)
            .await?
    };

    if args.explain {
        eprintln!(
            "[{} via {} in {}ms] {}",
            outcome.executor, outcome.strategy, outcome.elapsed_ms, outcome.explanation
        );
    }
    println!("{}", outcome.output);
    Ok(())
}

/// Run the HTTP daemon until Ctrl-C.
pub async fn daemon(config: AxialConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.daemon.bind, config.daemon.port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid bind address {}:{}: {}", config.daemon.bind, config.daemon.port, e)))?;

    let service = Arc::new(AxialService::from_config(&config).await?);

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        on_signal.cancel();
    });

    axial_gateway::serve(service, addr, shutdown).await
}

fn launch_ui(config: &AxialConfig) -> anyhow::Result<()> {
    let Some((program, args)) = config.ui.command.split_first() else {
        println!("Axial daemon: {}", config.daemon_url);
        println!("Set [ui] command in the config to launch a desktop UI.");
        return Ok(());
    };
    let child = std::process::Command::new(program)
        .args(args)
        .env("AXIAL_DAEMON_URL", &config.daemon_url)
        .stdin(std::process::Stdio::null())
        .spawn()
        .map_err(|e| Error::Internal(format!("failed to launch {}: {}", program, e)))?;
    println!("Launched {} (pid {})", program, child.id());
    Ok(())
}

/// Plan payload from `--file` or `--json`. Unparseable JSON is an invalid plan.
pub fn read_plan(file: Option<&Path>, json: Option<&str>) -> axial_core::Result<serde_json::Value> {
    let text = match (file, json) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(json)) => json.to_string(),
        (None, None) => return Err(Error::invalid_plan("no plan given (use --file or --json)")),
    };
    serde_json::from_str(&text).map_err(|e| Error::invalid_plan(format!("not valid JSON: {}", e)))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<Error>()
        .map(|e| e.kind().exit_code())
        .unwrap_or(1)
}
