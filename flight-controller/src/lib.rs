//! Attitude stabilization for a quadcopter.
//!
//! An MPU-6050 is sampled over I2C once per timer period. The sample is turned into tilt
//! angles and rotation rates, which feed a cascaded PID loop (angle then rate) whose output
//! is mixed with the pilot's throttle into four motor commands.
//!
//! Hardware is reached through `embedded-hal` traits and the [`RegisterBus`],
//! [`RadioInput`] and [`MotorOutput`] seams, so the whole loop runs on the host as well.
//!
//! [`RegisterBus`]: drivers::register_bus::RegisterBus
//! [`RadioInput`]: communication_interfaces::controller::RadioInput
//! [`MotorOutput`]: output::motors_state_manager::MotorOutput

#![cfg_attr(not(any(test, feature = "mock")), no_std)]

pub mod communication_interfaces;
pub mod config;
pub mod control;
pub mod drivers;
pub mod inertial_measurement;
pub mod output;
pub mod shared_core_values;
pub mod util;

pub use control::control_loops::{ControlLoop, MainControlLoopOutCommands};
pub use control::scheduler::{LoopTimerConfig, Scheduler, UpdateFlag};
pub use drivers::mpu_6050::MPU6050Sensor;
pub use util::error::{ArmError, ImuError};
