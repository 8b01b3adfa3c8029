//! Tracker configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration: background detector, five-second dwell, NYSE hours,
//! Yahoo quotes, JSONL sink in the working directory.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use finbot_core::data::{SymbolUniverse, UniverseError};
use finbot_core::market_hours::{GateMode, MarketHours, MarketHoursError, MarketSchedule};
use finbot_core::vision::{HsvRange, Morphology, MotionConfig};

/// Errors raised while loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid market hours: {0}")]
    Market(#[from] MarketHoursError),

    #[error("failed to load symbol universe: {0}")]
    Universe(#[from] UniverseError),
}

/// Top-level configuration for a tracking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub camera: CameraConfig,
    pub motion: MotionSection,
    pub locator: LocatorConfig,
    pub detector: DetectorConfig,
    pub decision: DecisionConfig,
    pub market: MarketConfig,
    pub symbols: SymbolsConfig,
    pub quotes: QuotesConfig,
    pub sink: SinkConfig,
}

impl TrackerConfig {
    /// Read and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motion
            .model
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.motion
            .morphology
            .validate()
            .map_err(ConfigError::Invalid)?;
        if let DetectorConfig::Color(range) = &self.detector {
            range.validate().map_err(ConfigError::Invalid)?;
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera size must be non-zero, got {}x{}",
                self.camera.width, self.camera.height
            )));
        }
        let dwell = self.decision.dwell_secs;
        if !dwell.is_finite() || dwell < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "decision.dwell_secs must be a non-negative number, got {dwell}"
            )));
        }
        self.market.schedule()?;
        Ok(())
    }
}

/// Where frames come from and how fast the loop runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// V4L2 device index (`/dev/video{N}`). When set, `dir` is ignored.
    pub device: Option<usize>,
    /// Capture size requested from the device; the driver may pick another.
    pub width: u32,
    pub height: u32,
    /// Directory of still images replayed in file-name order.
    pub dir: PathBuf,
    /// Restart from the first image when the directory is exhausted.
    pub looping: bool,
    /// Flip frames horizontally before processing.
    pub mirror: bool,
    /// Stop after this many ticks.
    pub max_frames: Option<u64>,
    /// Minimum wall-clock spacing between ticks.
    pub frame_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: 640,
            height: 480,
            dir: PathBuf::from("frames"),
            looping: false,
            mirror: false,
            max_frames: None,
            frame_interval_ms: 33,
        }
    }
}

impl CameraConfig {
    pub fn frame_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.frame_interval_ms)
    }
}

/// `[motion]`: background model tuning plus the morphology pass shared by
/// both detectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSection {
    #[serde(flatten)]
    pub model: MotionConfig,
    #[serde(flatten)]
    pub morphology: Morphology,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Regions smaller than this many pixels are ignored.
    pub min_area: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self { min_area: 500 }
    }
}

/// Which foreground detector to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DetectorConfig {
    #[default]
    Background,
    Color(HsvRange),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Seconds a side must hold before it commits.
    pub dwell_secs: f64,
    /// Seed for symbol selection; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            dwell_secs: 5.0,
            seed: None,
        }
    }
}

impl DecisionConfig {
    pub fn dwell(&self) -> Duration {
        Duration::milliseconds((self.dwell_secs * 1000.0).round() as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// IANA timezone of the exchange.
    pub timezone: String,
    /// Session open, `HH:MM` or `HH:MM:SS` local time.
    pub open: String,
    /// Session close, inclusive.
    pub close: String,
    pub gate: GateMode,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".into(),
            open: "09:30".into(),
            close: "16:00".into(),
            gate: GateMode::Exchange,
        }
    }
}

impl MarketConfig {
    pub fn hours(&self) -> Result<MarketHours, MarketHoursError> {
        MarketHours::parse(&self.timezone, &self.open, &self.close)
    }

    pub fn schedule(&self) -> Result<MarketSchedule, MarketHoursError> {
        Ok(match self.gate {
            GateMode::Exchange => MarketSchedule::Exchange(self.hours()?),
            GateMode::AlwaysOpen => MarketSchedule::AlwaysOpen,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolsConfig {
    /// CSV with a `Symbol` column, or one ticker per line.
    pub path: Option<PathBuf>,
}

impl SymbolsConfig {
    /// Load the universe, falling back to the built-in list when no path is set.
    pub fn load(&self) -> Result<SymbolUniverse, UniverseError> {
        match &self.path {
            Some(path) => SymbolUniverse::from_file(path),
            None => Ok(SymbolUniverse::default_us()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteProvider {
    #[default]
    Yahoo,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    pub provider: QuoteProvider,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            provider: QuoteProvider::Yahoo,
            timeout_secs: 10,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Destination for committed trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Append-only local file, one JSON object per line.
    Jsonl {
        #[serde(default = "default_jsonl_path")]
        path: PathBuf,
    },
    /// Firestore REST `createDocument`.
    Firestore(FirestoreConfig),
    /// Keep trades in memory (tests, dry runs).
    Memory,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Jsonl {
            path: default_jsonl_path(),
        }
    }
}

fn default_jsonl_path() -> PathBuf {
    PathBuf::from("trades.jsonl")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub app_id: String,
    pub user_id: String,
    /// Environment variable holding the OAuth bearer token, for example the
    /// output of `gcloud auth print-access-token`.
    pub token_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            app_id: "default-app-id".into(),
            user_id: "anonymous".into(),
            token_env: "FIRESTORE_TOKEN".into(),
            base_url: "https://firestore.googleapis.com/v1".into(),
            timeout_secs: 10,
        }
    }
}
