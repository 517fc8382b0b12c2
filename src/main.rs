use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::time::Duration;
use tokio::runtime::Builder;

use eco_ospf_sim::config::{Topology, TopologyConfig};
use eco_ospf_sim::monitor::{self, Monitor};
use eco_ospf_sim::{into_shared, Network, Protocol, RouterId, SimConfig};

#[derive(Parser)]
#[command(name = "eco-ospf-sim", about = "Simulate OSPF, GOSPF and EcoRP over a topology")]
struct Cli {
    /// JSON topology file (protocol, config and topology sections)
    #[arg(long, conflicts_with = "ring")]
    topology: Option<String>,

    /// Use a ring of N routers instead of a topology file
    #[arg(long)]
    ring: Option<RouterId>,

    /// Bandwidth of every ring link
    #[arg(long, default_value_t = 100.0)]
    bandwidth: f64,

    /// Overrides the protocol from the topology file
    #[arg(long, value_enum)]
    protocol: Option<Protocol>,

    /// JSON file with simulation tunables, overrides the topology file's
    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Traffic demand injected before the run, as src:dst:volume
    #[arg(long = "traffic", value_parser = parse_demand)]
    traffic: Vec<(RouterId, RouterId, f64)>,

    /// Random demands drawn from the seeded generator
    #[arg(long, default_value_t = 0)]
    random_flows: usize,

    #[arg(long, default_value_t = 1.0)]
    max_volume: f64,

    /// Poll the running network every N milliseconds
    #[arg(long)]
    monitor_ms: Option<u64>,

    /// Write the final snapshot here as JSON
    #[arg(long)]
    output: Option<String>,
}

fn parse_demand(s: &str) -> std::result::Result<(RouterId, RouterId, f64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [src, dst, volume] = parts.as_slice() else {
        return Err(format!("expected src:dst:volume, got '{}'", s));
    };
    let src = src.parse().map_err(|e| format!("bad source '{}': {}", src, e))?;
    let dst = dst.parse().map_err(|e| format!("bad destination '{}': {}", dst, e))?;
    let volume = volume.parse().map_err(|e| format!("bad volume '{}': {}", volume, e))?;
    Ok((src, dst, volume))
}

fn load_scenario(cli: &Cli) -> Result<TopologyConfig> {
    let mut scenario = match (&cli.topology, cli.ring) {
        (Some(path), _) => TopologyConfig::load_from_file(path)
            .with_context(|| format!("loading topology from {}", path))?,
        (None, Some(n)) => TopologyConfig::new(Protocol::Ospf, Topology::ring(n, cli.bandwidth)),
        (None, None) => bail!("either --topology or --ring is required"),
    };
    if let Some(protocol) = cli.protocol {
        scenario.protocol = protocol;
    }
    if let Some(path) = &cli.config {
        scenario.config = SimConfig::load(path).with_context(|| format!("loading config from {}", path))?;
    }
    Ok(scenario)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish())?;

    let cli = Cli::parse();
    let scenario = load_scenario(&cli)?;

    let mut network = Network::new(&scenario.topology, scenario.protocol, scenario.config)?;
    for &(src, dst, volume) in &cli.traffic {
        network.inject_traffic(src, dst, volume)?;
    }
    if cli.random_flows > 0 {
        let injected = network.inject_random(cli.random_flows, cli.max_volume)?;
        info!("Injected {} random flows", injected.len());
    }

    let rt = Builder::new_multi_thread().enable_all().build()?;

    let network = rt.block_on(async {
        let shared = into_shared(network);
        let poller = cli
            .monitor_ms
            .map(|ms| Monitor::start(shared.clone(), Duration::from_millis(ms)));

        monitor::drive(shared.clone(), cli.ticks).await;

        if let Some(poller) = poller {
            let report = poller.stop().await?;
            if let Some((tick, energy)) = report.energy_record().last() {
                info!("Last poll at tick {}: energy {:.1}", tick, energy);
            }
            if report.skipped > 0 {
                warn!("{} polls skipped while a tick was in progress", report.skipped);
            }
        }
        anyhow::Ok(shared)
    })?;

    let snapshot = network.blocking_read().snapshot();
    println!(
        "{} after {} ticks: energy {:.1}, delivered {}, dropped {}",
        snapshot.protocol,
        snapshot.time,
        snapshot.total_energy,
        snapshot.traffic.delivered,
        snapshot.traffic.dropped()
    );

    if let Some(path) = &cli.output {
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, content).with_context(|| format!("writing snapshot to {}", path))?;
        info!("Snapshot written to {}", path);
    }

    Ok(())
}
