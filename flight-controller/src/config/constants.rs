use shared_definitions::controller::PIDTuneConfig;

// IMU calibration
pub const CALIBRATION_SAMPLES: u8 = 10;
pub const CALIBRATION_DELAY_MS: u32 = 100;

// Drone limits
pub const MAX_INCLINATION: f32 = 45.0_f32; // degrees, full stick in angle mode
pub const MAX_ROTATION_RATE: f32 = 75.0_f32; // deg/s, full stick in rate mode and stabilizer clamp
pub const MAX_YAW_RATE: f32 = 90.0_f32;
pub const MAX_THROTTLE: f32 = 0.8_f32; // leaves headroom for the stabilizer

// Motor commands, normalized
pub const IDLE_MOTOR_POWER: f32 = 0.0_f32;
pub const MIN_MOTOR_POWER: f32 = 0.05_f32; // keeps props spinning while armed
pub const MAX_MOTOR_POWER: f32 = 1.0_f32;
/// PID outputs are in percent of motor power.
pub const PID_OUTPUT_SCALE: f32 = 0.01_f32;

// Arming
pub const ARM_THROTTLE_THRESHOLD: f32 = 0.05_f32;
/// Cycles a failed IMU read may reuse the previous sample before the motors are cut.
pub const MAX_STALE_CYCLES: u8 = 5;

// Loop timer, overflow of an 8 bit counter on a 16 MHz clock divided by 64 (~1.024 ms)
pub const TIMER_CLOCK_HZ: u32 = 16_000_000;
pub const TIMER_PRESCALER: u32 = 64;
pub const TIMER_COUNTER_SPAN: u32 = 256;

// Placeholder gains, every controller starts from the same values until tuned.
pub const DEFAULT_RATE_ROLL_TUNE: PIDTuneConfig = PIDTuneConfig::new(0.5, 0.5, 0.5, 0.5);
pub const DEFAULT_RATE_PITCH_TUNE: PIDTuneConfig = PIDTuneConfig::new(0.5, 0.5, 0.5, 0.5);
pub const DEFAULT_RATE_YAW_TUNE: PIDTuneConfig = PIDTuneConfig::new(0.5, 0.5, 0.5, 0.5);
pub const DEFAULT_STABILIZE_ROLL_TUNE: PIDTuneConfig = PIDTuneConfig::new(0.5, 0.5, 0.5, 0.5);
pub const DEFAULT_STABILIZE_PITCH_TUNE: PIDTuneConfig = PIDTuneConfig::new(0.5, 0.5, 0.5, 0.5);
pub const DEFAULT_STABILIZE_YAW_TUNE: PIDTuneConfig = PIDTuneConfig::new(0.5, 0.5, 0.5, 0.5);
