use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use onkyo_discovery::DiscoveryEvent;
use onkyo_engine::logging::{init_logging, init_logging_from_env, LoggingMode};
use onkyo_engine::EngineConfig;
use tracing::{error, info};

pub mod commands;
pub mod host;
pub mod network;
pub mod runner;

use host::{default_state_file, ConsoleHost};

/// Onkyo/Integra receiver control over eISCP
///
/// Finds receivers on the local network and mirrors one of them into a
/// console device registry that accepts commands on stdin.
#[derive(Parser, Debug)]
#[command(name = "onkyo")]
#[command(version)]
pub struct Cli {
    /// Verbose logging with source locations and frame dumps
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Broadcast a discovery query and list the receivers that answer
    Discover {
        /// Seconds to wait for answers
        #[arg(short, long, default_value = "3")]
        timeout: u64,
    },

    /// Connect to the first receiver found and run the session
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Tick interval in milliseconds until the session is ready
    #[arg(long, default_value = "2000")]
    pub startup_interval: u64,

    /// Tick interval in milliseconds once the session is ready
    #[arg(long, default_value = "20000")]
    pub steady_interval: u64,

    /// Delay in milliseconds between initial status queries
    #[arg(long, default_value = "1000")]
    pub stagger: u64,

    /// Use 0x17 as the end-of-message byte (older receivers)
    #[arg(long)]
    pub legacy_terminator: bool,

    /// Where to keep the device registry
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Keep the device registry in memory only
    #[arg(long, conflicts_with = "state_file")]
    pub no_persist: bool,
}

impl RunArgs {
    /// Engine configuration from the flags.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = if self.legacy_terminator {
            EngineConfig::legacy_terminator()
        } else {
            EngineConfig::default()
        };
        config.startup_tick_interval = Duration::from_millis(self.startup_interval);
        config.steady_tick_interval = Duration::from_millis(self.steady_interval);
        config.query_stagger = Duration::from_millis(self.stagger);

        config.validate().context("Invalid timing options")?;
        Ok(config)
    }

    fn host(&self) -> Result<ConsoleHost> {
        if self.no_persist {
            return Ok(ConsoleHost::new());
        }
        let path = self
            .state_file
            .clone()
            .or_else(default_state_file)
            .ok_or_else(|| anyhow!("Could not determine a data directory; pass --state-file"))?;
        ConsoleHost::with_state_file(path)
    }
}

fn discover(timeout: Duration) -> Result<()> {
    info!(timeout_s = timeout.as_secs(), "Discovering receivers");

    let mut found = 0;
    for event in onkyo_discovery::get_iter_with_timeout(timeout) {
        match event {
            DiscoveryEvent::Found(receiver) => {
                found += 1;
                println!(
                    "{:<16} {:<6} {:<12} {:<4} {}",
                    receiver.ip_address,
                    receiver.port,
                    receiver.model,
                    receiver.region,
                    receiver.mac_address
                );
            }
        }
    }

    if found == 0 {
        println!("No receivers found. Check that the receiver is on and on the same subnet,");
        println!("and that UDP port {} is not blocked.", onkyo_discovery::DISCOVERY_PORT);
        return Err(anyhow!("No receivers found"));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        init_logging(LoggingMode::Debug)
    } else {
        init_logging_from_env()
    }
    .context("Failed to initialize logging")?;

    let result = match cli.command {
        Command::Discover { timeout } => discover(Duration::from_secs(timeout)),
        Command::Run(args) => args
            .engine_config()
            .and_then(|config| Ok((config, args.host()?)))
            .and_then(|(config, host)| runner::run(config, host)),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
