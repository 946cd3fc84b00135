//! `servo-core` — state and playback engine for a 16-channel servo bank.
//!
//! ```text
//! PatternRunner ──► ActuatorRegistry ──► ServoDriver
//!      │                  │
//!      ▼                  ▼
//! PatternStore       calibration
//! ```

pub mod calibration;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod pattern;
pub mod registry;
pub mod runner;
pub mod types;

pub use error::{Result, ServoError};
pub use registry::{ActuatorRegistry, ChannelSnapshot};
pub use runner::{PatternRunner, RunEvent, RunRecord, RunStatus};
pub use types::{ActuatorConfig, Calibration, Channel, Limits, Pattern, Step};
