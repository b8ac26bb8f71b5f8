use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fleet_core::config::{load_config, ConfigError, SimulatorConfig};
use fleet_notify::Topic;
use fleetd::{DeploymentFilter, FleetSimulator, HealthCheckFilter, ServiceFilter, SimulatorError};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fleetsim", about = "Synthetic fleet-state simulator")]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Fixed RNG seed, overriding the config.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Tick the simulator until Ctrl-C or the duration elapses.
    Run {
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Print the seeded fleet as JSON.
    Snapshot {
        #[arg(long)]
        pretty: bool,
    },
    /// Inject an issue, optionally recover it, and print both summaries.
    Incident {
        #[arg(long, requires = "region")]
        service: Option<String>,
        #[arg(long, requires = "service")]
        region: Option<String>,
        #[arg(long)]
        recover: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("failed to load config at {path}: {source}")]
    LoadConfig {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error(transparent)]
    Simulator(#[from] SimulatorError),
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to wait for Ctrl-C: {0}")]
    Signal(#[source] std::io::Error),
    #[error("no tokio runtime available for the scheduler")]
    SchedulerUnavailable,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("fleetsim failed: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), MainError> {
    let config = resolve_config(cli.config.as_ref(), cli.seed)?;
    let sim = FleetSimulator::new(config)?;

    match cli.command {
        Command::Run {
            interval_ms,
            duration_secs,
        } => run_scheduler(&sim, interval_ms, duration_secs).await,
        Command::Snapshot { pretty } => {
            let snapshot = json!({
                "deployments": sim.deployments(&DeploymentFilter::default()),
                "healthChecks": sim.health_checks(&HealthCheckFilter::default()),
                "services": sim.services(&ServiceFilter::default()),
                "activeIssues": sim.active_issues(),
                "statusCounts": sim.status_counts(),
            });
            print_json(&snapshot, pretty)
        }
        Command::Incident {
            service,
            region,
            recover,
        } => {
            let injection = match (service, region) {
                (Some(service), Some(region)) => sim.simulate_issue_for(&service, &region),
                _ => sim.simulate_issue(),
            };
            let recovery =
                recover.then(|| sim.simulate_recovery(&injection.service, &injection.region));
            print_json(
                &json!({
                    "injection": injection,
                    "recovery": recovery,
                    "statusCounts": sim.status_counts(),
                }),
                true,
            )
        }
    }
}

fn resolve_config(
    path: Option<&PathBuf>,
    seed: Option<u64>,
) -> Result<SimulatorConfig, MainError> {
    let mut config = match path {
        Some(path) => load_config(path).map_err(|source| MainError::LoadConfig {
            path: path.clone(),
            source,
        })?,
        None => SimulatorConfig::default(),
    };
    if seed.is_some() {
        config.scheduler.seed = seed;
    }
    Ok(config)
}

async fn run_scheduler(
    sim: &FleetSimulator,
    interval_ms: Option<u64>,
    duration_secs: Option<u64>,
) -> Result<(), MainError> {
    let period = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| sim.config().scheduler.tick_interval());

    let _log = sim.subscribe(Topic::HealthChecks, |snapshot| {
        tracing::debug!(checks = snapshot.len(), "health checks changed");
    });
    let counts = sim.status_counts();
    tracing::info!(
        healthy = counts.healthy,
        degraded = counts.degraded,
        unhealthy = counts.unhealthy,
        "fleet seeded"
    );

    if !sim.start(period) {
        return Err(MainError::SchedulerUnavailable);
    }

    match duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => tokio::signal::ctrl_c().await.map_err(MainError::Signal)?,
    }

    sim.stop();
    let counts = sim.status_counts();
    tracing::info!(
        healthy = counts.healthy,
        degraded = counts.degraded,
        unhealthy = counts.unhealthy,
        active_issues = sim.active_issues().len(),
        failed_deliveries = sim.bus().failed_deliveries().len(),
        "fleet simulator stopped"
    );
    Ok(())
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), MainError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
