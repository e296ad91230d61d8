//! snmptopo - SNMP topology discovery
//!
//! Polls a list of devices for sysName/sysDescr, classifies them, infers
//! links, and emits the topology snapshot as JSON.

mod config;

use anyhow::Result;
use clap::Parser;
use snmptopo_core::{LinkStrategy, TopologySnapshot};
use snmptopo_discovery::{parse_addresses, DiscoveryScanner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "snmptopo")]
#[command(about = "SNMP-based network topology discovery")]
#[command(version)]
struct Args {
    /// IP addresses or hostnames to poll, separated by spaces (e.g. 192.168.1.1 core-sw.lab)
    #[arg(long, num_args = 1.., required_unless_present = "init_config")]
    ips: Vec<String>,

    /// Community string
    #[arg(long)]
    community: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "snmptopo.toml")]
    config: PathBuf,

    /// Link strategy: chain or fan-out
    #[arg(long)]
    strategy: Option<LinkStrategy>,

    /// Seed for the fan-out strategy
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum devices polled at once
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Per-query timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// SNMP agent port
    #[arg(long)]
    port: Option<u16>,

    /// Only query sysName; every device is typed unknown
    #[arg(long)]
    name_only: bool,

    /// Write the snapshot JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file to --config and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for the snapshot
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.init_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    info!("snmptopo v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    // Command-line flags override the file
    if let Some(community) = args.community {
        config.snmp.community = community;
    }
    if let Some(strategy) = args.strategy {
        config.discovery.strategy = strategy;
    }
    if let Some(seed) = args.seed {
        config.discovery.seed = Some(seed);
    }
    if let Some(max_in_flight) = args.max_in_flight {
        config.discovery.max_in_flight = max_in_flight;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.snmp.timeout_ms = timeout_ms;
    }
    if let Some(port) = args.port {
        config.snmp.port = port;
    }
    if args.name_only {
        config.discovery.query_description = false;
    }
    if let Some(output) = args.output {
        config.output.path = Some(output);
    }

    let addresses = parse_addresses(args.ips.as_slice(), &config.snmp.community)?;

    info!(
        devices = addresses.len(),
        port = config.snmp.port,
        strategy = %config.discovery.strategy,
        "Configuration loaded"
    );

    let scanner = DiscoveryScanner::new(Arc::new(config.client()), config.to_discovery_config());
    let snapshot = scanner.scan_once(&addresses).await?;

    match &config.output.path {
        Some(path) => {
            snapshot.write_json(path, config.output.pretty)?;
            info!(path = %path.display(), "Snapshot written");
            print_summary(&snapshot, path);
        }
        None => println!("{}", snapshot.to_json(config.output.pretty)?),
    }

    Ok(())
}

fn print_summary(snapshot: &TopologySnapshot, path: &Path) {
    println!("Discovered {} devices:", snapshot.nodes().len());
    for (name, device) in snapshot.nodes() {
        println!("  - {} [{}]", name, device.device_type);
    }
    for (device_type, count) in snapshot.type_counts() {
        println!("    {}: {}", device_type, count);
    }
    println!("{} links -> {}", snapshot.edges().len(), path.display());
}
