use core::ops::Add;

use crate::util::math::vectors::RotationVector3D;

pub trait FlyingVehicleMovementMapper<TActuator> {
    fn map_controller_output_to_actuators_input(
        &self,
        throttle: f32,
        rotation_input: RotationVector3D,
    ) -> TActuator;
}

/// Normalized power for each motor, `0.0` stopped and `1.0` full power.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MotorCommandSet {
    pub motor_front_left: f32,  //CW
    pub motor_front_right: f32, //CCW
    pub motor_rear_left: f32,   //CCW
    pub motor_rear_right: f32,  //CW
}

impl From<f32> for MotorCommandSet {
    fn from(value: f32) -> Self {
        Self {
            motor_front_left: value,
            motor_rear_left: value,
            motor_front_right: value,
            motor_rear_right: value,
        }
    }
}

impl Add for MotorCommandSet {
    type Output = MotorCommandSet;

    fn add(self, other: Self) -> Self::Output {
        Self {
            motor_front_left: self.motor_front_left + other.motor_front_left,
            motor_rear_left: self.motor_rear_left + other.motor_rear_left,
            motor_front_right: self.motor_front_right + other.motor_front_right,
            motor_rear_right: self.motor_rear_right + other.motor_rear_right,
        }
    }
}

impl MotorCommandSet {
    pub fn idle(idle_power: f32) -> Self {
        Self::from(idle_power)
    }

    // NaN goes to `min`, a broken estimate must never spin a motor up.
    fn constraint_value(value: f32, min: f32, max: f32) -> f32 {
        if value > max {
            return max;
        }
        if value >= min {
            return value;
        }
        min
    }

    pub fn get_constrained_to_range(&self, min: f32, max: f32) -> Self {
        Self {
            motor_front_left: Self::constraint_value(self.motor_front_left, min, max),
            motor_front_right: Self::constraint_value(self.motor_front_right, min, max),
            motor_rear_left: Self::constraint_value(self.motor_rear_left, min, max),
            motor_rear_right: Self::constraint_value(self.motor_rear_right, min, max),
        }
    }

    /// Output order: front right, front left, rear right, rear left.
    pub fn to_array(&self) -> [f32; 4] {
        [
            self.motor_front_right,
            self.motor_front_left,
            self.motor_rear_right,
            self.motor_rear_left,
        ]
    }
}

/// X frame quadcopter mixing matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadcopter {
    motor_min_power: f32,
    motor_max_power: f32,
    correction_scale: f32,
}

impl Quadcopter {
    /// `correction_scale` converts PID output units into motor power.
    pub fn new(motor_min_power: f32, motor_max_power: f32, correction_scale: f32) -> Self {
        Self {
            motor_min_power,
            motor_max_power,
            correction_scale,
        }
    }

    fn map_roll_to_motor_input(&self, roll_value: f32) -> MotorCommandSet {
        MotorCommandSet {
            motor_front_left: roll_value,
            motor_rear_left: roll_value,
            motor_front_right: -roll_value,
            motor_rear_right: -roll_value,
        }
    }

    fn map_pitch_to_motor_input(&self, pitch_value: f32) -> MotorCommandSet {
        MotorCommandSet {
            motor_front_left: pitch_value,
            motor_rear_left: -pitch_value,
            motor_front_right: pitch_value,
            motor_rear_right: -pitch_value,
        }
    }

    fn map_yaw_to_motor_input(&self, yaw_value: f32) -> MotorCommandSet {
        MotorCommandSet {
            motor_front_left: yaw_value,
            motor_rear_left: -yaw_value,
            motor_front_right: -yaw_value,
            motor_rear_right: yaw_value,
        }
    }
}

impl FlyingVehicleMovementMapper<MotorCommandSet> for Quadcopter {
    fn map_controller_output_to_actuators_input(
        &self,
        throttle: f32,
        rotation_input: RotationVector3D,
    ) -> MotorCommandSet {
        let scale = self.correction_scale;
        let motors_throttle = MotorCommandSet::from(throttle);
        let pitch_input = self.map_pitch_to_motor_input(rotation_input.pitch * scale);
        let roll_input = self.map_roll_to_motor_input(rotation_input.roll * scale);
        let yaw_input = self.map_yaw_to_motor_input(rotation_input.yaw * scale);
        let combined_output = motors_throttle + pitch_input + roll_input + yaw_input;
        combined_output.get_constrained_to_range(self.motor_min_power, self.motor_max_power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer() -> Quadcopter {
        Quadcopter::new(0.05, 1.0, 0.01)
    }

    #[test]
    fn no_correction_splits_throttle_evenly() {
        let command =
            mixer().map_controller_output_to_actuators_input(0.4, RotationVector3D::default());
        assert_eq!(command, MotorCommandSet::from(0.4));
    }

    #[test]
    fn each_axis_follows_its_sign_pattern() {
        let roll = mixer().map_controller_output_to_actuators_input(
            0.5,
            RotationVector3D {
                roll: 10.0,
                pitch: 0.0,
                yaw: 0.0,
            },
        );
        assert!((roll.motor_front_left - 0.6).abs() < 1e-4);
        assert!((roll.motor_rear_left - 0.6).abs() < 1e-4);
        assert!((roll.motor_front_right - 0.4).abs() < 1e-4);
        assert!((roll.motor_rear_right - 0.4).abs() < 1e-4);

        let pitch = mixer().map_controller_output_to_actuators_input(
            0.5,
            RotationVector3D {
                roll: 0.0,
                pitch: 10.0,
                yaw: 0.0,
            },
        );
        assert!((pitch.motor_front_left - 0.6).abs() < 1e-4);
        assert!((pitch.motor_front_right - 0.6).abs() < 1e-4);
        assert!((pitch.motor_rear_left - 0.4).abs() < 1e-4);
        assert!((pitch.motor_rear_right - 0.4).abs() < 1e-4);

        let yaw = mixer().map_controller_output_to_actuators_input(
            0.5,
            RotationVector3D {
                roll: 0.0,
                pitch: 0.0,
                yaw: 10.0,
            },
        );
        assert!((yaw.motor_front_left - 0.6).abs() < 1e-4);
        assert!((yaw.motor_rear_right - 0.6).abs() < 1e-4);
        assert!((yaw.motor_front_right - 0.4).abs() < 1e-4);
        assert!((yaw.motor_rear_left - 0.4).abs() < 1e-4);
    }

    #[test]
    fn output_is_clamped_to_motor_range() {
        let command = mixer().map_controller_output_to_actuators_input(
            0.9,
            RotationVector3D {
                roll: 500.0,
                pitch: 0.0,
                yaw: 0.0,
            },
        );
        assert!((command.motor_front_left - 1.0).abs() < 1e-4);
        assert!((command.motor_front_right - 0.05).abs() < 1e-4);
    }

    #[test]
    fn nan_is_clamped_to_minimum() {
        let command = MotorCommandSet::from(f32::NAN).get_constrained_to_range(0.0, 1.0);
        assert_eq!(command, MotorCommandSet::from(0.0));
    }

    #[test]
    fn array_order_matches_motor_outputs() {
        let command = MotorCommandSet {
            motor_front_left: 0.2,
            motor_front_right: 0.1,
            motor_rear_left: 0.4,
            motor_rear_right: 0.3,
        };
        assert_eq!(command.to_array(), [0.1, 0.2, 0.3, 0.4]);
    }
}
