use shared_definitions::controller::PIDTuneConfig;

use crate::control::{pid::PidAxis, scheduler::LoopTimerConfig};

use super::constants::{
    ARM_THROTTLE_THRESHOLD, DEFAULT_RATE_PITCH_TUNE, DEFAULT_RATE_ROLL_TUNE,
    DEFAULT_RATE_YAW_TUNE, DEFAULT_STABILIZE_PITCH_TUNE, DEFAULT_STABILIZE_ROLL_TUNE,
    DEFAULT_STABILIZE_YAW_TUNE, MAX_INCLINATION, MAX_ROTATION_RATE, MAX_STALE_CYCLES,
    MAX_THROTTLE, MAX_YAW_RATE, TIMER_CLOCK_HZ, TIMER_COUNTER_SPAN, TIMER_PRESCALER,
};

/// Everything the control loop can be tuned with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightControllerConfig {
    /// Indexed by [`PidAxis`].
    pub pid_tunes: [PIDTuneConfig; PidAxis::COUNT],
    pub max_inclination: f32,
    pub max_rotation_rate: f32,
    pub max_yaw_rate: f32,
    pub max_throttle: f32,
    pub arm_throttle_threshold: f32,
    pub max_stale_cycles: u8,
    pub loop_timer: LoopTimerConfig,
}

impl FlightControllerConfig {
    pub fn tune(&self, axis: PidAxis) -> PIDTuneConfig {
        self.pid_tunes[axis as usize]
    }

    pub fn with_tune(mut self, axis: PidAxis, tune: PIDTuneConfig) -> Self {
        self.pid_tunes[axis as usize] = tune;
        self
    }
}

impl Default for FlightControllerConfig {
    fn default() -> Self {
        Self {
            pid_tunes: [
                DEFAULT_RATE_ROLL_TUNE,
                DEFAULT_RATE_PITCH_TUNE,
                DEFAULT_RATE_YAW_TUNE,
                DEFAULT_STABILIZE_ROLL_TUNE,
                DEFAULT_STABILIZE_PITCH_TUNE,
                DEFAULT_STABILIZE_YAW_TUNE,
            ],
            max_inclination: MAX_INCLINATION,
            max_rotation_rate: MAX_ROTATION_RATE,
            max_yaw_rate: MAX_YAW_RATE,
            max_throttle: MAX_THROTTLE,
            arm_throttle_threshold: ARM_THROTTLE_THRESHOLD,
            max_stale_cycles: MAX_STALE_CYCLES,
            loop_timer: LoopTimerConfig::new(TIMER_CLOCK_HZ, TIMER_PRESCALER, TIMER_COUNTER_SPAN),
        }
    }
}
