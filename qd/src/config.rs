//! Service configuration types and loading
//!
//! Centralizes request bounds, monitor cadence, worker pacing, and the
//! gateway socket location. Values come from a YAML file when one exists
//! (explicit `--config` path, then `.queendaemon.yml`, then the user config
//! directory) and fall back to defaults otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request bounds for board size and worker count
    pub limits: LimitsConfig,

    /// Run monitoring cadence and completion caps
    pub monitor: MonitorConfig,

    /// Worker pacing
    pub worker: WorkerConfig,

    /// Gateway socket and delivery timeouts
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".queendaemon.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("queendaemon").join("queendaemon.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Request bounds for board size and worker count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Smallest accepted board size
    #[serde(rename = "min-board-size")]
    pub min_board_size: u8,

    /// Largest accepted board size
    #[serde(rename = "max-board-size")]
    pub max_board_size: u8,

    /// Board size used when a request omits it
    #[serde(rename = "default-board-size")]
    pub default_board_size: u8,

    /// Smallest accepted worker count
    #[serde(rename = "min-workers")]
    pub min_workers: usize,

    /// Largest accepted worker count
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Worker count used when a request omits it
    #[serde(rename = "default-workers")]
    pub default_workers: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_board_size: 1,
            max_board_size: 20,
            default_board_size: 8,
            min_workers: 1,
            max_workers: 10,
            default_workers: 4,
        }
    }
}

impl LimitsConfig {
    pub fn is_valid_board_size(&self, n: u8) -> bool {
        (self.min_board_size..=self.max_board_size).contains(&n)
    }

    pub fn is_valid_worker_count(&self, workers: usize) -> bool {
        (self.min_workers..=self.max_workers).contains(&workers)
    }
}

/// Run monitoring cadence and completion caps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between progress checks in milliseconds
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,

    /// Number of progress checks before the run is cut off
    #[serde(rename = "tick-cap")]
    pub tick_cap: u32,

    /// Soft elapsed-time limit in milliseconds
    #[serde(rename = "soft-limit-ms")]
    pub soft_limit_ms: u64,

    /// Hard backstop in milliseconds; fires even if the monitor stalls
    #[serde(rename = "backstop-ms")]
    pub backstop_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            tick_cap: 30,
            soft_limit_ms: 60_000,
            backstop_ms: 65_000,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn soft_limit(&self) -> Duration {
        Duration::from_millis(self.soft_limit_ms)
    }

    pub fn backstop(&self) -> Duration {
        Duration::from_millis(self.backstop_ms)
    }
}

/// Worker pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Delay between successive frontier rows in milliseconds; bounds the
    /// message burst rate, not required for correctness
    #[serde(rename = "throttle-ms")]
    pub throttle_ms: u64,

    /// Command channel capacity per worker
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,

    /// Dispatch the row-0 seed to the first frontier worker after deploy
    #[serde(rename = "seed-frontier")]
    pub seed_frontier: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 50,
            channel_capacity: 64,
            seed_frontier: false,
        }
    }
}

impl WorkerConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Gateway socket and delivery timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Socket path override; defaults to the runtime directory
    #[serde(rename = "socket-path")]
    pub socket_path: Option<PathBuf>,

    /// Base delivery timeout in milliseconds, scaled by board size
    #[serde(rename = "base-timeout-ms")]
    pub base_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            base_timeout_ms: 60_000,
        }
    }
}

impl GatewayConfig {
    /// Resolved socket path
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(default_socket_path)
    }

    /// Delivery timeout for a run request, scaled to the board size
    ///
    /// Larger boards search exponentially bigger trees; the original tiers
    /// are kept: base up to N=8, doubled up to N=12, quadrupled above.
    pub fn delivery_timeout(&self, n: u8) -> Duration {
        let base = self.base_timeout_ms;
        let ms = if n <= 8 {
            base
        } else if n <= 12 {
            base * 2
        } else {
            base * 4
        };
        Duration::from_millis(ms)
    }
}

/// Default socket path for gateway IPC
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("queendaemon")
        .join("gateway.sock")
}
