//! Lock bridge console.
//!
//! Runs the bridge service against simulated GPIO outputs, adds the
//! configured default locks, then reads administrative commands from stdin
//! until `quit`, end of input, or Ctrl-C.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lockbridge_bridge::{BridgeCommand, BridgeService, CommandDispatcher, TokioClock, TracingPublisher};
use lockbridge_core::{BridgeConfig, RandomSource, SeededRandom, ThreadRandom};
use lockbridge_hardware::SimulatedGpioPin;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod console;

/// Smart-lock bridge emulator
#[derive(Debug, Parser)]
#[command(name = "lockbridge")]
#[command(version)]
#[command(about = "Emulates a bridge of smart locks with status LEDs")]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for reproducible jam, fault and battery outcomes
    #[arg(long)]
    seed: Option<u64>,

    /// Start with an empty bridge instead of the configured default locks
    #[arg(long)]
    no_default_locks: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let led_pins = config
        .led_pins
        .get(..config.max_locks)
        .context("Fewer LED pins configured than max_locks")?;
    let pins = SimulatedGpioPin::bank(led_pins).context("Failed to configure LED outputs")?;

    let random: Box<dyn RandomSource> = match cli.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    };

    let dispatcher = CommandDispatcher::from_config(
        pins,
        &config,
        Box::new(TokioClock),
        random,
        Box::new(TracingPublisher),
    )
    .context("Failed to create command dispatcher")?;

    let handle = BridgeService::new(dispatcher, &config).start();
    let client = handle.client();

    if !cli.no_default_locks {
        for name in &config.default_locks {
            let reply = client
                .execute(BridgeCommand::Add { name: name.clone() })
                .await?;
            if !reply.success {
                warn!("Default lock '{}' not added: {}", name, reply.message);
            }
        }
    }

    info!("Lock bridge started with {} slots", config.max_locks);
    console::run(&client).await?;

    handle.shutdown().await.context("Bridge service did not stop cleanly")?;
    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}
