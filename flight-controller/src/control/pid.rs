use core::ops::{Index, IndexMut};

use shared_definitions::controller::PIDTuneConfig;

use super::integrator::Integrator;

const PER_CYCLE: f32 = 1.0;

/// Proportional-integral-derivative controller with a clamped integral.
///
/// The integral grows by `error * ki` once per update, independent of the interval. The
/// derivative acts on the measurement, not on the error, so a setpoint step does not kick
/// the output. The first update after a reset has no derivative term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PID {
    previous_measurement: Option<f32>,
    proportional_multiplier: f32,
    integral_multiplier: f32,
    derivative_multiplier: f32,
    error_integrator: Integrator,
    last_output: f32,
}

impl PID {
    /// Negative gains are treated as zero.
    pub fn new(
        proportional_multiplier: f32,
        integral_multiplier: f32,
        derivative_multiplier: f32,
        max_accumulated_error: f32,
    ) -> Self {
        PID {
            previous_measurement: None,
            proportional_multiplier: proportional_multiplier.max(0.0),
            integral_multiplier: integral_multiplier.max(0.0),
            derivative_multiplier: derivative_multiplier.max(0.0),
            error_integrator: Integrator::new(max_accumulated_error),
            last_output: 0.0,
        }
    }

    pub fn from_tune(tune: &PIDTuneConfig) -> Self {
        Self::new(
            tune.proportional_multiplier,
            tune.integral_multiplier,
            tune.derivative_multiplier,
            tune.max_accumulated_error,
        )
    }

    /// Keeps the accumulated error, clamped to the new limit.
    pub fn set_tune(&mut self, tune: &PIDTuneConfig) {
        self.proportional_multiplier = tune.proportional_multiplier.max(0.0);
        self.integral_multiplier = tune.integral_multiplier.max(0.0);
        self.derivative_multiplier = tune.derivative_multiplier.max(0.0);
        self.error_integrator.set_limit(tune.max_accumulated_error);
    }

    pub fn update(
        &mut self,
        desired_state: f32,
        measured_state: f32,
        iteration_length: f32,
    ) -> f32 {
        let error = desired_state - measured_state;
        let valid_interval = iteration_length > 0.0;

        let accumulated_error = if valid_interval {
            self.error_integrator
                .add_new_value(error * self.integral_multiplier, PER_CYCLE)
        } else {
            self.error_integrator.get_current_value()
        };

        let change_rate = match self.previous_measurement {
            Some(previous_value) if valid_interval => {
                (previous_value - measured_state) / iteration_length
            }
            _ => 0.0,
        };
        self.previous_measurement = Some(measured_state);

        let proportional_output = error * self.proportional_multiplier;
        let derivative_output = change_rate * self.derivative_multiplier;

        self.last_output = proportional_output + accumulated_error + derivative_output;
        self.last_output
    }

    pub fn reset(&mut self) {
        self.error_integrator.reset();
        self.previous_measurement = None;
        self.last_output = 0.0;
    }

    pub fn accumulated_error(&self) -> f32 {
        self.error_integrator.get_current_value()
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }
}

#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidAxis {
    RateRoll = 0,
    RatePitch = 1,
    RateYaw = 2,
    StabilizeRoll = 3,
    StabilizePitch = 4,
    StabilizeYaw = 5,
}

impl PidAxis {
    pub const COUNT: usize = 6;
    pub const ALL: [PidAxis; PidAxis::COUNT] = [
        PidAxis::RateRoll,
        PidAxis::RatePitch,
        PidAxis::RateYaw,
        PidAxis::StabilizeRoll,
        PidAxis::StabilizePitch,
        PidAxis::StabilizeYaw,
    ];
    pub const STABILIZE: [PidAxis; 3] = [
        PidAxis::StabilizeRoll,
        PidAxis::StabilizePitch,
        PidAxis::StabilizeYaw,
    ];
}

/// The six controllers of the cascade, addressed by [`PidAxis`].
#[derive(Debug, Clone, PartialEq)]
pub struct PidBank {
    pids: [PID; PidAxis::COUNT],
}

impl PidBank {
    pub fn new(tunes: &[PIDTuneConfig; PidAxis::COUNT]) -> Self {
        Self {
            pids: tunes.map(|tune| PID::from_tune(&tune)),
        }
    }

    pub fn set_tune(&mut self, axis: PidAxis, tune: &PIDTuneConfig) {
        self[axis].set_tune(tune);
    }

    pub fn reset_all(&mut self) {
        self.pids.iter_mut().for_each(PID::reset);
    }

    pub fn reset_stabilize(&mut self) {
        for axis in PidAxis::STABILIZE {
            self[axis].reset();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PidAxis, &PID)> {
        PidAxis::ALL.into_iter().zip(self.pids.iter())
    }
}

impl Index<PidAxis> for PidBank {
    type Output = PID;

    fn index(&self, axis: PidAxis) -> &Self::Output {
        &self.pids[axis as usize]
    }
}

impl IndexMut<PidAxis> for PidBank {
    fn index_mut(&mut self, axis: PidAxis) -> &mut Self::Output {
        &mut self.pids[axis as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.004;

    #[test]
    fn zero_error_gives_zero_output() {
        let mut pid = PID::new(0.5, 0.5, 0.5, 0.5);
        for _ in 0..100 {
            assert_eq!(pid.update(0.0, 0.0, DT), 0.0);
        }
        assert_eq!(pid.accumulated_error(), 0.0);
    }

    #[test]
    fn integral_never_leaves_the_limit() {
        let mut pid = PID::new(0.0, 2.0, 0.0, 0.5);
        for cycle in 0..10_000 {
            let error = if cycle < 5_000 { 30.0 } else { -1000.0 };
            pid.update(error, 0.0, DT);
            assert!(pid.accumulated_error().abs() <= 0.5);
        }
        assert!((pid.accumulated_error() + 0.5).abs() < 1e-4);
        assert!((pid.last_output() + 0.5).abs() < 1e-4);
    }

    #[test]
    fn integral_recovers_right_after_windup() {
        let mut pid = PID::new(0.0, 1.0, 0.0, 1.0);
        for _ in 0..1_000 {
            pid.update(100.0, 0.0, DT);
        }
        assert!((pid.accumulated_error() - 1.0).abs() < 1e-4);
        // One cycle of opposite error already pulls it off the limit.
        pid.update(-0.4, 0.0, DT);
        assert!((pid.accumulated_error() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn output_adds_the_three_terms() {
        let mut pid = PID::new(2.0, 1.0, 0.1, 10.0);
        // First update, no derivative yet.
        assert!((pid.update(10.0, 4.0, 0.5) - (12.0 + 6.0)).abs() < 1e-4);
        // Measurement rose by 2 in 0.5 s, derivative pushes back by 0.1 * 4.
        assert!((pid.update(10.0, 6.0, 0.5) - (8.0 + 10.0 - 0.4)).abs() < 1e-4);
    }

    #[test]
    fn setpoint_step_does_not_kick_the_derivative() {
        let mut pid = PID::new(0.0, 0.0, 1.0, 1.0);
        pid.update(0.0, 5.0, DT);
        assert_eq!(pid.update(100.0, 5.0, DT), 0.0);
    }

    #[test]
    fn reset_clears_accumulator_and_history() {
        let mut pid = PID::new(0.0, 1.0, 1.0, 10.0);
        pid.update(5.0, 0.0, 1.0);
        pid.update(5.0, 1.0, 1.0);
        assert!(pid.accumulated_error() > 0.0);

        pid.reset();
        assert_eq!(pid.accumulated_error(), 0.0);
        assert_eq!(pid.last_output(), 0.0);
        // No derivative against the measurement seen before the reset.
        assert_eq!(pid.update(0.0, 50.0, 1.0), -10.0);
    }

    #[test]
    fn integral_step_does_not_scale_with_the_interval() {
        let mut pid = PID::new(0.0, 1.0, 0.0, 10.0);
        pid.update(1.0, 0.0, 0.001024);
        assert_eq!(pid.accumulated_error(), 1.0);
        pid.update(1.0, 0.0, 0.5);
        assert_eq!(pid.accumulated_error(), 2.0);
    }

    #[test]
    fn negative_gains_are_ignored() {
        let mut pid = PID::new(-1.0, -1.0, -1.0, 1.0);
        assert_eq!(pid.update(10.0, 0.0, DT), 0.0);
    }

    #[test]
    fn zero_interval_skips_integral_and_derivative() {
        let mut pid = PID::new(1.0, 1.0, 1.0, 10.0);
        pid.update(0.0, 1.0, DT);
        assert!((pid.update(2.0, 0.0, 0.0) - (2.0 + pid.accumulated_error())).abs() < 1e-4);
    }

    #[test]
    fn bank_indexes_by_axis() {
        let mut tunes = [PIDTuneConfig::new(0.5, 0.5, 0.5, 0.5); PidAxis::COUNT];
        tunes[PidAxis::RateYaw as usize] = PIDTuneConfig::new(3.0, 0.0, 0.0, 0.0);
        let mut bank = PidBank::new(&tunes);

        assert_eq!(bank[PidAxis::RateYaw].update(1.0, 0.0, DT), 3.0);
        assert!((bank[PidAxis::RateRoll].update(1.0, 0.0, DT) - 1.0).abs() < 1e-4);

        bank.set_tune(PidAxis::RateRoll, &PIDTuneConfig::new(0.0, 0.0, 0.0, 0.001));
        assert!((bank[PidAxis::RateRoll].accumulated_error() - 0.001).abs() < 1e-7);
    }

    #[test]
    fn bank_resets() {
        let mut bank = PidBank::new(&[PIDTuneConfig::new(0.0, 1.0, 0.0, 10.0); PidAxis::COUNT]);
        for axis in PidAxis::ALL {
            bank[axis].update(1.0, 0.0, 1.0);
        }

        bank.reset_stabilize();
        for (axis, pid) in bank.iter() {
            let expected = if PidAxis::STABILIZE.contains(&axis) { 0.0 } else { 1.0 };
            assert_eq!(pid.accumulated_error(), expected);
        }

        bank.reset_all();
        assert!(bank.iter().all(|(_, pid)| pid.accumulated_error() == 0.0));
    }
}
