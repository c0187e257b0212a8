use log::{info, warn};

use crate::util::error::ArmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmTransition {
    None,
    Armed,
    Disarmed,
    Refused(ArmError),
}

/// Arm switch gate.
///
/// A refused or forced disarm holds until the switch is turned off, so the motors never
/// start just because a condition cleared while the switch was left on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArmingState {
    pub armed: bool,
    pub failsafe_active: bool,
    switch_reset_required: bool,
}

impl ArmingState {
    pub fn update(
        &mut self,
        arm_switch: bool,
        throttle: f32,
        throttle_threshold: f32,
        sensor_ready: bool,
    ) -> ArmTransition {
        if !arm_switch {
            self.switch_reset_required = false;
            return if self.armed {
                self.disarm();
                ArmTransition::Disarmed
            } else {
                ArmTransition::None
            };
        }

        if self.armed {
            if !sensor_ready {
                warn!("IMU lost while armed, disarming");
                self.disarm();
                self.switch_reset_required = true;
                return ArmTransition::Disarmed;
            }
            return ArmTransition::None;
        }

        if self.switch_reset_required || self.failsafe_active {
            return ArmTransition::None;
        }

        let refusal = if !sensor_ready {
            Some(ArmError::SensorNotReady)
        } else if throttle > throttle_threshold {
            Some(ArmError::ThrottleNotIdle)
        } else {
            None
        };

        match refusal {
            Some(reason) => {
                warn!("Arming refused: {}", reason);
                self.switch_reset_required = true;
                ArmTransition::Refused(reason)
            }
            None => {
                info!("Armed");
                self.armed = true;
                ArmTransition::Armed
            }
        }
    }

    /// Radio link lost. Disarms and blocks arming until the link is back and the switch
    /// has been turned off.
    pub fn signal_loss(&mut self) -> ArmTransition {
        let was_armed = self.armed;
        self.armed = false;
        self.failsafe_active = true;
        self.switch_reset_required = true;
        if was_armed {
            warn!("Radio signal lost, disarming");
            ArmTransition::Disarmed
        } else {
            ArmTransition::None
        }
    }

    pub fn signal_restored(&mut self) {
        self.failsafe_active = false;
    }

    pub fn disarm(&mut self) {
        if self.armed {
            info!("Disarmed");
        }
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
