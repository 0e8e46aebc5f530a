//! Configuration module for LuaFlow.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{FlowError, Result};

/// Cutscene playback configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Root directory holding `Chap{N}/{name}.lua` scripts.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,
    /// Global function called after the script body has run.
    #[serde(default = "default_entry_function")]
    pub entry_function: String,
    /// Length of one scheduler tick in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_scripts_dir() -> String {
    "cutscenes".to_string()
}

fn default_entry_function() -> String {
    "playCutscene".to_string()
}

fn default_tick_interval() -> u64 {
    20
}

impl PlaybackConfig {
    /// Tick length as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            entry_function: default_entry_function(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Lua interpreter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    /// Maximum number of instructions per call (0 = unlimited).
    #[serde(default)]
    pub max_instructions: u64,
    /// Maximum interpreter memory in megabytes (0 = unlimited).
    #[serde(default)]
    pub max_memory_mb: usize,
    /// Remove file, process and module loading functions from the globals.
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,
}

fn default_sandbox() -> bool {
    true
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_instructions: 0,
            max_memory_mb: 0,
            sandbox: default_sandbox(),
        }
    }
}

/// Movement command configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MovementConfig {
    /// Speed used when a script does not pass one, in units per second.
    #[serde(default = "default_move_speed")]
    pub default_speed: f32,
    /// Upper bound of the arrival distance.
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,
}

fn default_move_speed() -> f32 {
    5.0
}

fn default_distance_threshold() -> f32 {
    0.01
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            default_speed: default_move_speed(),
            distance_threshold: default_distance_threshold(),
        }
    }
}

/// Camera command configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Follow speed used when a script does not pass one.
    #[serde(default = "default_follow_speed")]
    pub follow_speed: f32,
    /// Distance at which a waiting `follow` considers the camera arrived.
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f32,
}

fn default_follow_speed() -> f32 {
    0.1
}

fn default_arrival_threshold() -> f32 {
    0.1
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_speed: default_follow_speed(),
            arrival_threshold: default_arrival_threshold(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file written alongside stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Playback configuration.
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Interpreter configuration.
    #[serde(default)]
    pub script: ScriptConfig,
    /// Movement configuration.
    #[serde(default)]
    pub movement: MovementConfig,
    /// Camera configuration.
    #[serde(default)]
    pub camera: CameraConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FlowError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FlowError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `LUAFLOW_SCRIPTS_DIR`: Override the scripts directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("LUAFLOW_SCRIPTS_DIR") {
            if !dir.is_empty() {
                self.playback.scripts_dir = dir;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.playback.entry_function.trim().is_empty() {
            return Err(FlowError::Config(
                "playback.entry_function must not be empty".to_string(),
            ));
        }
        if self.playback.tick_interval_ms == 0 {
            return Err(FlowError::Config(
                "playback.tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.movement.default_speed > 0.0) {
            return Err(FlowError::Config(
                "movement.default_speed must be positive".to_string(),
            ));
        }
        if self.movement.distance_threshold < 0.0 || self.camera.arrival_threshold < 0.0 {
            return Err(FlowError::Config(
                "distance thresholds must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
