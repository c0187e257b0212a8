use log::{info, trace};

use super::vehicle_movement_mappers::MotorCommandSet;

/// Whatever turns normalized motor power into ESC signals.
pub trait MotorOutput {
    /// Front right, front left, rear right, rear left.
    fn set_motor_power(&mut self, values: [f32; 4]);
}

/// Last gate before the motors. Disarmed always means idle, whatever was requested.
pub struct QuadcopterMotorsStateManager<M>
where
    M: MotorOutput,
{
    output: M,
    idle_power: f32,
    max_power: f32,
    last_command: MotorCommandSet,
}

impl<M> QuadcopterMotorsStateManager<M>
where
    M: MotorOutput,
{
    pub fn new(output: M, idle_power: f32, max_power: f32) -> Self {
        Self {
            output,
            idle_power,
            max_power,
            last_command: MotorCommandSet::idle(idle_power),
        }
    }

    pub fn set_motor_power(&mut self, command: MotorCommandSet, armed: bool) {
        let command = if armed {
            command.get_constrained_to_range(self.idle_power, self.max_power)
        } else {
            MotorCommandSet::idle(self.idle_power)
        };
        trace!("Motor command {:?}", command);
        self.last_command = command;
        self.output.set_motor_power(command.to_array());
    }

    pub fn kill_motors(&mut self) {
        self.set_motor_power(MotorCommandSet::idle(self.idle_power), false);
        info!("Killed motors");
    }

    pub fn last_command(&self) -> MotorCommandSet {
        self.last_command
    }

    pub fn output(&self) -> &M {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingMotors {
        writes: std::vec::Vec<[f32; 4]>,
    }

    impl MotorOutput for RecordingMotors {
        fn set_motor_power(&mut self, values: [f32; 4]) {
            self.writes.push(values);
        }
    }

    #[test]
    fn disarmed_forces_idle() {
        let mut motors = QuadcopterMotorsStateManager::new(RecordingMotors::default(), 0.0, 1.0);
        motors.set_motor_power(MotorCommandSet::from(0.7), false);
        assert_eq!(motors.output().writes, vec![[0.0; 4]]);
        assert_eq!(motors.last_command(), MotorCommandSet::from(0.0));
    }

    #[test]
    fn armed_commands_are_clamped() {
        let mut motors = QuadcopterMotorsStateManager::new(RecordingMotors::default(), 0.0, 1.0);
        motors.set_motor_power(
            MotorCommandSet {
                motor_front_left: 1.5,
                motor_front_right: -0.2,
                motor_rear_left: 0.5,
                motor_rear_right: 0.25,
            },
            true,
        );
        assert_eq!(motors.output().writes, vec![[0.0, 1.0, 0.25, 0.5]]);
    }

    #[test]
    fn kill_sends_idle() {
        let mut motors = QuadcopterMotorsStateManager::new(RecordingMotors::default(), 0.0, 1.0);
        motors.set_motor_power(MotorCommandSet::from(0.5), true);
        motors.kill_motors();
        assert_eq!(motors.output().writes.last(), Some(&[0.0; 4]));
    }
}
