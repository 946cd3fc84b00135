use crate::calibration::{calibrate, check_limits};
use crate::driver::ServoDriver;
use crate::error::{Result, ServoError};
use crate::types::{ActuatorConfig, Channel, CHANNEL_COUNT};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
struct ActuatorState {
    config: ActuatorConfig,
    /// Last successfully applied logical angle.
    position: Option<f64>,
}

/// Read-only view of one configured channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub channel: Channel,
    pub config: ActuatorConfig,
    pub position: Option<f64>,
}

/// Per-channel configuration and position, one lock per channel.
///
/// A channel's lock is held across the driver call so that a reconfigure
/// cannot interleave with an in-flight move on the same channel.
pub struct ActuatorRegistry {
    driver: Arc<dyn ServoDriver>,
    slots: [Mutex<Option<ActuatorState>>; CHANNEL_COUNT],
}

impl ActuatorRegistry {
    pub fn new(driver: Arc<dyn ServoDriver>) -> Self {
        Self {
            driver,
            slots: std::array::from_fn(|_| Mutex::new(None)),
        }
    }

    /// Store `config` for `channel` and seek to its initial position.
    ///
    /// The config stays stored even when the initial move fails; position is
    /// then left unset and the move error is returned.
    pub fn configure(&self, channel: Channel, config: ActuatorConfig) -> Result<()> {
        let mut slot = self.slot(channel);
        self.driver
            .set_pulse_range(channel, config.min_pulse, config.max_pulse)?;

        let initial = config.initial_position;
        *slot = Some(ActuatorState {
            config,
            position: None,
        });
        info!(channel = %channel, "configured servo");

        self.apply(channel, &mut slot, initial)
    }

    pub fn move_to(&self, channel: Channel, angle: f64) -> Result<()> {
        let mut slot = self.slot(channel);
        self.apply(channel, &mut slot, angle)
    }

    pub fn get(&self, channel: Channel) -> Result<ChannelSnapshot> {
        let slot = self.slot(channel);
        let state = slot
            .as_ref()
            .ok_or(ServoError::NotConfigured(channel.as_u8()))?;
        Ok(ChannelSnapshot {
            channel,
            config: state.config.clone(),
            position: state.position,
        })
    }

    /// All configured channels, in channel order.
    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        Channel::all()
            .filter_map(|channel| {
                let slot = self.slot(channel);
                slot.as_ref().map(|state| ChannelSnapshot {
                    channel,
                    config: state.config.clone(),
                    position: state.position,
                })
            })
            .collect()
    }

    fn apply(
        &self,
        channel: Channel,
        slot: &mut Option<ActuatorState>,
        angle: f64,
    ) -> Result<()> {
        let state = slot
            .as_mut()
            .ok_or(ServoError::NotConfigured(channel.as_u8()))?;

        let physical = calibrate(angle, &state.config);
        if let Err((min, max)) = check_limits(physical, &state.config) {
            warn!(channel = %channel, angle, physical, min, max, "move rejected: outside limits");
            return Err(ServoError::OutOfLimits {
                channel: channel.as_u8(),
                angle: physical,
                min,
                max,
            });
        }

        self.driver.set_angle(channel, physical)?;
        state.position = Some(angle);
        info!(channel = %channel, angle, physical, "moved servo");
        Ok(())
    }

    fn slot(&self, channel: Channel) -> MutexGuard<'_, Option<ActuatorState>> {
        self.slots[channel.index()]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}
