//! Capability boundary over the physical PWM controller.
//!
//! The registry only ever talks to a [`ServoDriver`]; a hardware backend is a
//! drop-in implementation of the trait. [`SimulatedDriver`] keeps the last
//! commanded state in memory and is what `servod` runs against when no
//! hardware backend is wired in.

use crate::types::{Channel, CHANNEL_COUNT};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

/// Upper bound on pulse width accepted by the simulated controller, in µs.
pub const MAX_PULSE_US: u32 = 5000;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("driver error on channel {channel}: {message}")]
pub struct DriverError {
    pub channel: u8,
    pub message: String,
}

impl DriverError {
    pub fn new(channel: Channel, message: impl Into<String>) -> Self {
        Self {
            channel: channel.as_u8(),
            message: message.into(),
        }
    }
}

pub trait ServoDriver: Send + Sync {
    fn set_pulse_range(&self, channel: Channel, min_us: u32, max_us: u32)
        -> Result<(), DriverError>;

    fn set_angle(&self, channel: Channel, angle: f64) -> Result<(), DriverError>;
}

/// A call observed by [`SimulatedDriver`], in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    PulseRange { channel: u8, min_us: u32, max_us: u32 },
    Angle { channel: u8, angle: f64 },
}

#[derive(Debug, Default)]
struct SimState {
    pulse_ranges: [Option<(u32, u32)>; CHANNEL_COUNT],
    angles: [Option<f64>; CHANNEL_COUNT],
    calls: Vec<DriverCall>,
    failing: HashSet<u8>,
}

#[derive(Debug, Default)]
pub struct SimulatedDriver {
    state: Mutex<SimState>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call on `channel` fail until cleared.
    pub fn fail_channel(&self, channel: Channel, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failing.insert(channel.as_u8());
        } else {
            state.failing.remove(&channel.as_u8());
        }
    }

    pub fn angle(&self, channel: Channel) -> Option<f64> {
        self.lock().angles[channel.index()]
    }

    pub fn pulse_range(&self, channel: Channel) -> Option<(u32, u32)> {
        self.lock().pulse_ranges[channel.index()]
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ServoDriver for SimulatedDriver {
    fn set_pulse_range(
        &self,
        channel: Channel,
        min_us: u32,
        max_us: u32,
    ) -> Result<(), DriverError> {
        let mut state = self.lock();
        if state.failing.contains(&channel.as_u8()) {
            return Err(DriverError::new(channel, "controller not responding"));
        }
        if min_us >= max_us {
            return Err(DriverError::new(
                channel,
                format!("pulse minimum {min_us}µs must be less than maximum {max_us}µs"),
            ));
        }
        if max_us > MAX_PULSE_US {
            return Err(DriverError::new(
                channel,
                format!("pulse maximum {max_us}µs exceeds {MAX_PULSE_US}µs"),
            ));
        }
        state.pulse_ranges[channel.index()] = Some((min_us, max_us));
        state.calls.push(DriverCall::PulseRange {
            channel: channel.as_u8(),
            min_us,
            max_us,
        });
        Ok(())
    }

    fn set_angle(&self, channel: Channel, angle: f64) -> Result<(), DriverError> {
        let mut state = self.lock();
        if state.failing.contains(&channel.as_u8()) {
            return Err(DriverError::new(channel, "controller not responding"));
        }
        if state.pulse_ranges[channel.index()].is_none() {
            return Err(DriverError::new(channel, "pulse range not set"));
        }
        state.angles[channel.index()] = Some(angle);
        state.calls.push(DriverCall::Angle {
            channel: channel.as_u8(),
            angle,
        });
        Ok(())
    }
}
