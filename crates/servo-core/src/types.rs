use crate::error::{Result, ServoError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of PWM outputs on the controller.
pub const CHANNEL_COUNT: usize = 16;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A validated actuator output index in `0..=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Channel(u8);

impl Channel {
    pub fn new(raw: i64) -> Result<Self> {
        if (0..CHANNEL_COUNT as i64).contains(&raw) {
            Ok(Channel(raw as u8))
        } else {
            Err(ServoError::InvalidChannel(raw.to_string()))
        }
    }

    pub fn all() -> impl Iterator<Item = Channel> {
        (0..CHANNEL_COUNT as u8).map(Channel)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }
}

/// Parses a decimal channel number, as found in URL paths.
impl FromStr for Channel {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().parse::<i64>() {
            Ok(raw) => Channel::new(raw),
            Err(_) => Err(ServoError::InvalidChannel(s.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ActuatorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    #[serde(default)]
    pub center_offset: f64,
    #[serde(default = "default_multiplier")]
    pub angle_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            center_offset: 0.0,
            angle_multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    #[serde(default = "default_min_angle")]
    pub min_angle: f64,
    #[serde(default = "default_max_angle")]
    pub max_angle: f64,
}

fn default_min_angle() -> f64 {
    0.0
}

fn default_max_angle() -> f64 {
    180.0
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_angle: default_min_angle(),
            max_angle: default_max_angle(),
        }
    }
}

/// Per-channel configuration, replaced wholesale on every configure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorConfig {
    /// Pulse width in microseconds at the low end of travel.
    pub min_pulse: u32,
    /// Pulse width in microseconds at the high end of travel.
    pub max_pulse: u32,
    #[serde(default = "default_initial_position")]
    pub initial_position: f64,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<Calibration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
}

fn default_initial_position() -> f64 {
    90.0
}

impl ActuatorConfig {
    pub fn new(min_pulse: u32, max_pulse: u32) -> Self {
        Self {
            min_pulse,
            max_pulse,
            initial_position: default_initial_position(),
            inverted: false,
            calibration: None,
            limits: None,
        }
    }

    /// Effective limits; the full 0..=180 window when none are configured.
    pub fn effective_limits(&self) -> Limits {
        self.limits.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// One timed step of a pattern. Channel keys stay raw integers so that
/// bad channels surface at playback rather than at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub positions: BTreeMap<i64, f64>,
    /// Seconds to hold after the step's moves are issued.
    #[serde(default = "default_step_duration")]
    pub duration: f64,
}

fn default_step_duration() -> f64 {
    1.0
}

impl Step {
    pub fn new(positions: impl IntoIterator<Item = (i64, f64)>, duration: f64) -> Self {
        Self {
            positions: positions.into_iter().collect(),
            duration,
        }
    }

    pub fn wait(&self) -> Result<std::time::Duration> {
        std::time::Duration::try_from_secs_f64(self.duration).map_err(|_| {
            ServoError::Validation(format!(
                "step duration must be a non-negative number of seconds, got {}",
                self.duration
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Sum of all step durations, ignoring steps with unusable durations.
    pub fn total_duration(&self) -> std::time::Duration {
        self.steps.iter().filter_map(|s| s.wait().ok()).sum()
    }
}
