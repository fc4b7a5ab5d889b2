//! Rocon requester simulation CLI
//!
//! Runs a number of requesters against a simulated scheduler over an
//! in-memory bus and reports what happened.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rocon_production::telemetry::init_logging;
use rocon_production::{load_config, ClientError, RequesterClient, RequesterConfig};
use rocon_simulation::{InMemoryBus, RequestWorkload, SchedulerConfig, SimulatedScheduler};
use rocon_types::AllocationOutcome;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rocon-sim")]
#[command(about = "Run resource requesters against a simulated scheduler")]
#[command(version)]
struct Cli {
    /// Number of requesters
    #[arg(short, long, default_value = "4")]
    requesters: usize,

    /// Allocations each requester makes
    #[arg(long, default_value = "5")]
    requests_per_requester: usize,

    /// Capability inventory as name=slots (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "rocon_apps/talker=1,rocon_apps/listener=2"
    )]
    capabilities: Vec<String>,

    /// Fraction of requests naming an unknown capability
    #[arg(long, default_value = "0.1")]
    unknown_ratio: f64,

    /// Longest hold time in milliseconds
    #[arg(long, default_value = "200")]
    max_hold_ms: u64,

    /// Give up waiting for a grant after this many milliseconds
    #[arg(long, default_value = "5000")]
    wait_ms: u64,

    /// Requester config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed
    #[arg(long, default_value = "12345")]
    seed: u64,
}

#[derive(Debug, Default)]
struct Tally {
    granted: usize,
    closed: usize,
    timed_out: usize,
}

fn parse_inventory(entries: &[String]) -> Result<SchedulerConfig> {
    let mut config = SchedulerConfig::default();
    for entry in entries {
        let Some((name, slots)) = entry.split_once('=') else {
            bail!("Capability entry {entry:?} is not name=slots");
        };
        let slots: usize = slots
            .parse()
            .with_context(|| format!("Invalid slot count in {entry:?}"))?;
        config = config.with_capability(name.trim(), slots);
    }
    Ok(config)
}

async fn run_requester(
    client: RequesterClient,
    workload: Arc<RequestWorkload>,
    seed: u64,
    count: usize,
    wait: Duration,
) -> Result<Tally> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tally = Tally::default();

    for _ in 0..count {
        let item = workload.generate_one(&mut rng);
        let capability = item.resource.capability_name().to_string();
        let id = client
            .request_allocation_with(vec![item.resource], item.priority, Duration::ZERO)
            .await?;

        match client.await_allocation_outcome_within(id, wait).await {
            Ok(AllocationOutcome::Granted { .. }) => {
                tally.granted += 1;
                info!(request = %id, %capability, hold = ?item.hold, "Holding resource");
                tokio::time::sleep(item.hold).await;
            }
            Ok(AllocationOutcome::Closed { reason, problem, .. }) => {
                tally.closed += 1;
                info!(request = %id, %capability, %reason, %problem, "Request refused");
                continue;
            }
            Err(ClientError::Timeout(_)) => {
                tally.timed_out += 1;
                warn!(request = %id, %capability, "Gave up waiting");
            }
            Err(e) => return Err(e.into()),
        }

        match client.release_allocation_within(id, wait).await {
            Ok(released) if released.reason.is_failure() => {
                info!(request = %id, reason = %released.reason, "Released with reason");
            }
            Ok(_) => {}
            Err(ClientError::Timeout(_)) => warn!(request = %id, "Release not confirmed"),
            Err(e) => return Err(e.into()),
        }
    }

    client.shutdown().await?;
    Ok(tally)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("info");

    let requester_config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Loading requester config from {}", path.display()))?,
        None => RequesterConfig::default(),
    };
    let scheduler_config = parse_inventory(&cli.capabilities)?
        .with_requester_timeout(Duration::from_secs(10));
    let mut capabilities: Vec<String> = scheduler_config.inventory.keys().cloned().collect();
    capabilities.sort();

    let bus = InMemoryBus::new();
    let scheduler = SimulatedScheduler::spawn(bus.clone(), scheduler_config);
    let workload = Arc::new(
        RequestWorkload::new(capabilities)
            .with_unknown_ratio(cli.unknown_ratio)
            .with_max_hold(Duration::from_millis(cli.max_hold_ms)),
    );

    info!(
        requesters = cli.requesters,
        requests_per_requester = cli.requests_per_requester,
        seed = cli.seed,
        "Starting simulation"
    );

    let mut tasks = Vec::with_capacity(cli.requesters);
    for i in 0..cli.requesters {
        let client = RequesterClient::spawn(bus.clone(), requester_config.clone());
        tasks.push(tokio::spawn(run_requester(
            client,
            workload.clone(),
            cli.seed.wrapping_add(i as u64),
            cli.requests_per_requester,
            Duration::from_millis(cli.wait_ms),
        )));
    }

    let mut total = Tally::default();
    for task in tasks {
        let tally = task.await.context("Requester task panicked")??;
        total.granted += tally.granted;
        total.closed += tally.closed;
        total.timed_out += tally.timed_out;
    }

    let stats = scheduler.stats();
    println!("Requests granted:   {}", total.granted);
    println!("Requests refused:   {}", total.closed);
    println!("Waits timed out:    {}", total.timed_out);
    println!("Scheduler grants:   {}", stats.granted);
    println!("Scheduler releases: {}", stats.released);
    println!("Bus messages:       {}", bus.message_count());

    Ok(())
}
