use shared_definitions::controller::PIDTuneConfig;

use crate::util::math::vectors::{RotationVector2D, RotationVector3D};

use super::pid::{PidAxis, PidBank};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleModeControllerInput {
    pub desired_rotation: RotationVector2D,
    pub measured_rotation: RotationVector2D,
    pub iteration_time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationRateControllerInput {
    pub desired_rotation_rate: RotationVector3D,
    pub measured_rotation_rate: RotationVector3D,
    pub iteration_time: f32,
}

/// Angle error to desired rate, then rate error to motor correction.
///
/// Yaw has no absolute angle reference, so it only goes through the rate stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadedFlightController {
    pids: PidBank,
    max_rotation_rate: f32,
}

impl CascadedFlightController {
    pub fn new(tunes: &[PIDTuneConfig; PidAxis::COUNT], max_rotation_rate: f32) -> Self {
        Self {
            pids: PidBank::new(tunes),
            max_rotation_rate,
        }
    }

    /// Outer stage, returns the rotation rates that bring the aircraft to the desired angles.
    pub fn get_stabilize_output(&mut self, input: AngleModeControllerInput) -> RotationVector2D {
        let roll = self.pids[PidAxis::StabilizeRoll].update(
            input.desired_rotation.roll,
            input.measured_rotation.roll,
            input.iteration_time,
        );
        let pitch = self.pids[PidAxis::StabilizePitch].update(
            input.desired_rotation.pitch,
            input.measured_rotation.pitch,
            input.iteration_time,
        );

        RotationVector2D {
            roll: roll.clamp(-self.max_rotation_rate, self.max_rotation_rate),
            pitch: pitch.clamp(-self.max_rotation_rate, self.max_rotation_rate),
        }
    }

    /// Inner stage, returns the per-axis motor corrections.
    pub fn get_rotation_rate_output(
        &mut self,
        input: RotationRateControllerInput,
    ) -> RotationVector3D {
        let roll = self.pids[PidAxis::RateRoll].update(
            input.desired_rotation_rate.roll,
            input.measured_rotation_rate.roll,
            input.iteration_time,
        );
        let pitch = self.pids[PidAxis::RatePitch].update(
            input.desired_rotation_rate.pitch,
            input.measured_rotation_rate.pitch,
            input.iteration_time,
        );
        let yaw = self.pids[PidAxis::RateYaw].update(
            input.desired_rotation_rate.yaw,
            input.measured_rotation_rate.yaw,
            input.iteration_time,
        );

        RotationVector3D { pitch, roll, yaw }
    }

    pub fn set_pid_tune(&mut self, axis: PidAxis, tune: &PIDTuneConfig) {
        self.pids.set_tune(axis, tune);
    }

    pub fn reset(&mut self) {
        self.pids.reset_all();
    }

    /// Used when the sticks command rates directly and the outer stage sits idle.
    pub fn reset_stabilize(&mut self) {
        self.pids.reset_stabilize();
    }

    pub fn pids(&self) -> &PidBank {
        &self.pids
    }
}
