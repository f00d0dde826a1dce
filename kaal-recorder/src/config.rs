//! Defines all configuration structures for the recorder engine.
//!
//! These structs are deserialized with `serde`, usually through
//! [`RecorderConfig::load`], which layers an optional TOML file under
//! `KAAL_*` environment overrides. Every field has a default, so an empty
//! source yields the stock command-center behaviour.

use crate::common::SimulationKind;
use crate::error::{KaalError, Result};
use crate::log::{default_seed_entries, MessagePools, SeedEntry};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// The top-level configuration for the `KaalEngine`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// How fast the recording ticker fires.
    #[serde(default)]
    pub resolution: ClockResolution,

    /// Chance, per tick, that a random log entry is emitted.
    #[serde(default = "default_emit_probability")]
    pub emit_probability: f64,

    /// Timezone log timestamps are rendered in. Uses IANA names
    /// (e.g. "Asia/Kolkata").
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Fixed RNG seed. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Durations of the timed simulations.
    #[serde(default)]
    pub delays: DelayConfig,

    /// Messages random entries are drawn from.
    #[serde(default)]
    pub messages: MessagePools,

    /// Whether the log starts out holding `initial_log`.
    #[serde(default = "default_true")]
    pub seed_initial_log: bool,

    #[serde(default = "default_seed_entries")]
    pub initial_log: Vec<SeedEntry>,

    /// Capacity of each broadcast event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Defines the operational speed of the recording ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// One tick per second. Elapsed time matches the wall clock.
    #[default]
    RealTime,
    /// A user-defined speed in ticks per second, for accelerated demos.
    Custom { ticks_per_second: u64 },
}

impl ClockResolution {
    pub fn period(&self) -> Duration {
        match self {
            ClockResolution::RealTime => Duration::from_secs(1),
            ClockResolution::Custom { ticks_per_second } => {
                Duration::from_secs_f64(1.0 / (*ticks_per_second).max(1) as f64)
            }
        }
    }
}

/// Delays, in milliseconds, of each timed simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct DelayConfig {
    #[serde(default = "default_export_ms")]
    pub export_ms: u64,
    #[serde(default = "default_replay_ms")]
    pub replay_ms: u64,
    #[serde(default = "default_deploy_ms")]
    pub deploy_ms: u64,
    #[serde(default = "default_interface_load_ms")]
    pub interface_load_ms: u64,
}

impl DelayConfig {
    pub fn for_kind(&self, kind: SimulationKind) -> Duration {
        let ms = match kind {
            SimulationKind::Export => self.export_ms,
            SimulationKind::Replay => self.replay_ms,
            SimulationKind::Deployment => self.deploy_ms,
            SimulationKind::InterfaceLoad => self.interface_load_ms,
        };
        Duration::from_millis(ms)
    }
}

impl RecorderConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// `KAAL_*` environment overrides (`__` separates nested keys, e.g.
    /// `KAAL_DELAYS__EXPORT_MS=500`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("KAAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let parsed: RecorderConfig = settings.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Parses configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        let parsed: RecorderConfig = settings.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.emit_probability) {
            return Err(KaalError::InvalidConfig(format!(
                "emit_probability must be within [0, 1], got {}",
                self.emit_probability
            )));
        }
        if let ClockResolution::Custom { ticks_per_second: 0 } = self.resolution {
            return Err(KaalError::InvalidConfig(
                "ticks_per_second must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(KaalError::InvalidConfig(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        self.messages.validate()
    }

    /// The log entries the recorder starts out with.
    pub fn initial_entries(&self) -> &[SeedEntry] {
        if self.seed_initial_log {
            &self.initial_log
        } else {
            &[]
        }
    }
}

// --- Default value functions for serde ---

fn default_emit_probability() -> f64 {
    0.05
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_true() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    256
}

fn default_export_ms() -> u64 {
    2_000
}

fn default_replay_ms() -> u64 {
    2_500
}

fn default_deploy_ms() -> u64 {
    2_500
}

fn default_interface_load_ms() -> u64 {
    1_500
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            export_ms: default_export_ms(),
            replay_ms: default_replay_ms(),
            deploy_ms: default_deploy_ms(),
            interface_load_ms: default_interface_load_ms(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            resolution: ClockResolution::default(),
            emit_probability: default_emit_probability(),
            timezone: default_timezone(),
            seed: None,
            delays: DelayConfig::default(),
            messages: MessagePools::default(),
            seed_initial_log: default_true(),
            initial_log: default_seed_entries(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
