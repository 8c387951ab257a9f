//! Configuration constants and settings for participants and the simulator.
//!
//! Magic numbers live here so the tick cadence, endowment formulas and
//! payload limits can be tuned in one place.

use crate::error::{AgoraError, AgoraResult};
use crate::marketplace::InventoryItem;
use std::path::PathBuf;
use std::time::Duration;

/// Interval in milliseconds between two ticks of the same participant.
pub const TICK_INTERVAL_MS: u64 = 30_000;

/// Delay in milliseconds before a participant's first tick.
pub const START_DELAY_MS: u64 = 10_000;

/// Default wall-clock duration of a simulation run.
pub const DEFAULT_RUN_SECS: u64 = 180;

/// Default number of participants spawned by the simulator.
pub const DEFAULT_PARTICIPANTS: usize = 3;

/// Number of items every participant starts with.
pub const INITIAL_ITEM_COUNT: usize = 3;

/// Money granted per unit of the first salt byte (`(salt[0] + 1) * MONEY_UNIT`).
pub const MONEY_UNIT: u64 = 1_000;

/// Base value granted per unit of an item's salt byte.
pub const BASE_VALUE_UNIT: u64 = 5;

/// Random bytes behind a display ID.
pub const DISPLAY_ID_BYTES: usize = 6;

/// Random bytes behind an auction or item ID.
pub const OBJECT_ID_BYTES: usize = 15;

/// Maximum size of a signed request envelope.
pub const MAX_ENVELOPE_SIZE: u64 = 256 * 1024;

/// Maximum size of a stored checkpoint.
pub const MAX_CHECKPOINT_SIZE: usize = 1024 * 1024;

/// Key prefixes used in the state store.
pub mod store_keys {
    /// Full participant snapshot, suffixed with the participant key.
    pub const SNAPSHOT: &str = "participant";
    /// Single auction record, suffixed with the auction ID.
    pub const AUCTION: &str = "auction";
}

/// Environment variable overriding the participant count.
pub const PARTICIPANTS_ENV: &str = "AGORA_PARTICIPANTS";

/// Environment variable overriding the tick interval in milliseconds.
pub const TICK_MS_ENV: &str = "AGORA_TICK_MS";

/// Environment variable overriding the first-tick delay in milliseconds.
pub const START_DELAY_MS_ENV: &str = "AGORA_START_DELAY_MS";

/// Environment variable overriding the run duration in seconds.
pub const RUN_SECS_ENV: &str = "AGORA_RUN_SECS";

/// Environment variable enabling file checkpoints under the given directory.
pub const DATA_DIR_ENV: &str = "AGORA_DATA_DIR";

/// Starting money derived from the participant salt.
pub fn initial_money(salt: &[u8; 32]) -> u64 {
    (u64::from(salt[0]) + 1) * MONEY_UNIT
}

/// Starting base value of the `index`-th item derived from the participant salt.
pub fn initial_base_value(salt: &[u8; 32], index: usize) -> u64 {
    u64::from(salt[(index + 1) % salt.len()]) * BASE_VALUE_UNIT
}

/// Per-participant settings. Unset fields are derived from a random salt.
#[derive(Debug, Clone, Default)]
pub struct ParticipantConfig {
    /// Short label used in logs.
    pub display_id: Option<String>,
    /// Ed25519 seed for the participant's identity key.
    pub seed: Option<[u8; 32]>,
    /// Starting money.
    pub money: Option<u64>,
    /// Starting inventory.
    pub inventory: Option<Vec<InventoryItem>>,
}

impl ParticipantConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display_id(mut self, id: impl Into<String>) -> Self {
        self.display_id = Some(id.into());
        self
    }

    pub fn with_seed(mut self, seed: [u8; 32]) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_money(mut self, money: u64) -> Self {
        self.money = Some(money);
        self
    }

    pub fn with_inventory(mut self, items: Vec<InventoryItem>) -> Self {
        self.inventory = Some(items);
        self
    }
}

/// Settings for a whole simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub participants: usize,
    pub tick_interval: Duration,
    pub start_delay: Duration,
    pub run_time: Duration,
    /// Directory for file checkpoints; in-memory storage when `None`.
    pub data_dir: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            participants: DEFAULT_PARTICIPANTS,
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            start_delay: Duration::from_millis(START_DELAY_MS),
            run_time: Duration::from_secs(DEFAULT_RUN_SECS),
            data_dir: None,
        }
    }
}

impl SimulationConfig {
    /// Defaults overridden by any `AGORA_*` environment variables that are set.
    pub fn from_env() -> AgoraResult<Self> {
        let mut config = Self::default();
        if let Some(n) = env_parse::<usize>(PARTICIPANTS_ENV)? {
            config.participants = n;
        }
        if let Some(ms) = env_parse::<u64>(TICK_MS_ENV)? {
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>(START_DELAY_MS_ENV)? {
            config.start_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>(RUN_SECS_ENV)? {
            config.run_time = Duration::from_secs(secs);
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AgoraResult<()> {
        if self.participants == 0 {
            return Err(AgoraError::Config("at least one participant is required".into()));
        }
        if self.tick_interval.is_zero() {
            return Err(AgoraError::Config("tick interval must be non-zero".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> AgoraResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AgoraError::Config(format!("{name}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Default directory for file checkpoints.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("agora")
}

/// Return the current Unix timestamp in milliseconds.
///
/// For testable code, prefer accepting a `TimeProvider` parameter instead.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
