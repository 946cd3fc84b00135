use crate::driver::DriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServoError {
    #[error("invalid channel number: {0} (expected 0-15)")]
    InvalidChannel(String),

    #[error("servo not configured on channel {0}")]
    NotConfigured(u8),

    #[error("angle {angle} outside limits [{min}, {max}] on channel {channel}")]
    OutOfLimits {
        channel: u8,
        angle: f64,
        min: f64,
        max: f64,
    },

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("pattern already running: {0}")]
    AlreadyRunning(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ServoError {
    /// Stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ServoError::InvalidChannel(_) => "invalid_channel",
            ServoError::NotConfigured(_) => "not_configured",
            ServoError::OutOfLimits { .. } => "out_of_limits",
            ServoError::PatternNotFound(_) => "pattern_not_found",
            ServoError::AlreadyRunning(_) => "already_running",
            ServoError::Validation(_) => "validation_error",
            ServoError::Driver(_) => "driver_error",
            ServoError::Io(_) | ServoError::Yaml(_) | ServoError::Json(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, ServoError>;
