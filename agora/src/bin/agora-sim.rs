//! Runs a group of auction participants on an in-process network.
//!
//! Usage:
//!   agora-sim --participants 4 --tick-ms 2000 --run-secs 60
//!
//! Unset flags fall back to `AGORA_*` environment variables and then to the
//! built-in defaults. With `--json`, logs go to stderr and the final
//! per-participant summaries are printed to stdout as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agora::config::{self, ParticipantConfig, SimulationConfig};
use agora::error::AgoraResult;
use agora::{
    FileStore, LocalNetwork, MemoryStore, Participant, Scheduler, StateStore, SystemTimeProvider,
    ThreadRng,
};
use async_trait::async_trait;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "agora-sim", about = "Leaderless English auctions between autonomous peers")]
struct Cli {
    /// Number of participants to spawn
    #[arg(short, long)]
    participants: Option<usize>,

    /// Milliseconds between ticks of one participant
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Milliseconds before the first tick
    #[arg(long)]
    start_delay_ms: Option<u64>,

    /// Seconds to run before shutting everyone down
    #[arg(long)]
    run_secs: Option<u64>,

    /// Write checkpoints under this directory instead of keeping them in memory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use the platform data directory for checkpoints
    #[arg(long, conflicts_with = "data_dir")]
    persist: bool,

    /// Print final summaries as JSON lines on stdout (logs go to stderr)
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> AgoraResult<SimulationConfig> {
        let mut config = SimulationConfig::from_env()?;
        if let Some(n) = self.participants {
            config.participants = n;
        }
        if let Some(ms) = self.tick_ms {
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.start_delay_ms {
            config.start_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = self.run_secs {
            config.run_time = Duration::from_secs(secs);
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        } else if self.persist {
            config.data_dir = Some(config::default_data_dir());
        }
        config.validate()?;
        Ok(config)
    }
}

/// Checkpoint backend picked at startup.
#[derive(Clone)]
enum SimStore {
    Memory(MemoryStore),
    File(FileStore),
}

#[async_trait]
impl StateStore for SimStore {
    async fn get(&self, key: &str) -> AgoraResult<Option<Vec<u8>>> {
        match self {
            Self::Memory(s) => s.get(key).await,
            Self::File(s) => s.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AgoraResult<()> {
        match self {
            Self::Memory(s) => s.put(key, value).await,
            Self::File(s) => s.put(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> AgoraResult<()> {
        match self {
            Self::Memory(s) => s.delete(key).await,
            Self::File(s) => s.delete(key).await,
        }
    }
}

fn init_logging(to_stderr: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if to_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let json = cli.json;
    init_logging(json);
    let config = cli.into_config()?;

    let store = match &config.data_dir {
        Some(dir) => SimStore::File(FileStore::open(dir).await?),
        None => SimStore::Memory(MemoryStore::new()),
    };
    info!(
        "starting {} participants (tick {:?}, first tick after {:?}, run {:?})",
        config.participants, config.tick_interval, config.start_delay, config.run_time
    );

    let network = LocalNetwork::new();
    let mut scheduler = Scheduler::new(config.tick_interval, config.start_delay);
    for _ in 0..config.participants {
        let participant = Arc::new(Participant::new(
            ParticipantConfig::new(),
            network.clone(),
            SystemTimeProvider::new(),
            ThreadRng::new(),
            store.clone(),
        ));
        participant.initialise().await?;
        scheduler.spawn(participant);
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("failed to listen for Ctrl-C: {}", e);
            }
            info!("interrupted, shutting down");
        }
        () = tokio::time::sleep(config.run_time) => info!("run time elapsed, shutting down"),
    }

    let reports = scheduler.shutdown_all().await;
    let failures: usize = reports.iter().map(|r| r.failures).sum();

    for participant in scheduler.participants() {
        let summary = participant.summary();
        if json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            info!(
                "{} ({}): money {}, {} items, {} known auctions",
                summary.display_id,
                summary.public_key.short(),
                summary.money,
                summary.items,
                summary.known_auctions
            );
        }
    }
    info!(
        "simulation finished: {} routed requests, {} shutdown failures",
        network.request_count(),
        failures
    );
    Ok(())
}
