use crate::error::Result;
use crate::types::{ActuatorConfig, Pattern, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/servo-configurator/config.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// LogConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Channels configured at startup, keyed by raw channel index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub servos: BTreeMap<i64, ActuatorConfig>,
    /// Patterns preloaded into the store at startup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<Pattern>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            log: LogConfig::default(),
            servos: BTreeMap::new(),
            patterns: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path`, or fall back to defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let error = |message: String| ConfigWarning {
            level: WarnLevel::Error,
            message,
        };
        let warning = |message: String| ConfigWarning {
            level: WarnLevel::Warning,
            message,
        };

        for (&channel, servo) in &self.servos {
            if !(0..CHANNEL_COUNT as i64).contains(&channel) {
                warnings.push(error(format!(
                    "servo channel {channel} is out of range (0-15)"
                )));
            }
            if servo.min_pulse >= servo.max_pulse {
                warnings.push(error(format!(
                    "servo {channel}: minPulse {} must be less than maxPulse {}",
                    servo.min_pulse, servo.max_pulse
                )));
            }
            if let Some(limits) = &servo.limits {
                if limits.min_angle > limits.max_angle {
                    warnings.push(error(format!(
                        "servo {channel}: minAngle {} is greater than maxAngle {}",
                        limits.min_angle, limits.max_angle
                    )));
                }
            }
            if let Some(cal) = &servo.calibration {
                if cal.angle_multiplier == 0.0 {
                    warnings.push(warning(format!(
                        "servo {channel}: angleMultiplier of 0 pins every move to one angle"
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for pattern in &self.patterns {
            if pattern.name.trim().is_empty() {
                warnings.push(error("pattern with an empty name".to_string()));
                continue;
            }
            if !seen.insert(pattern.name.as_str()) {
                warnings.push(warning(format!(
                    "pattern '{}' is defined more than once; the last definition wins",
                    pattern.name
                )));
            }
            for (index, step) in pattern.steps.iter().enumerate() {
                if step.wait().is_err() {
                    warnings.push(error(format!(
                        "pattern '{}' step {index}: invalid duration {}",
                        pattern.name, step.duration
                    )));
                }
                for channel in step.positions.keys() {
                    if !self.servos.contains_key(channel) {
                        warnings.push(warning(format!(
                            "pattern '{}' step {index}: channel {channel} is not configured at startup",
                            pattern.name
                        )));
                    }
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
