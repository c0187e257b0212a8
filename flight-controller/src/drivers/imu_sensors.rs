use core::fmt::Debug;
use core::ops::Sub;

use super::mpu_6050::registers::{MpuAccelRange, MpuGyroRange};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AxisSample<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

/// Counts straight out of the output registers.
pub type RawAxisSample = AxisSample<i16>;
/// Raw counts minus the calibration baseline, wide enough to never saturate.
pub type CorrectedAxisSample = AxisSample<i32>;

/// Joins a register pair, high byte first, into a signed 16 bit value.
pub const fn combine_bytes(high: u8, low: u8) -> i16 {
    ((high as u16) << 8 | low as u16) as i16
}

impl RawAxisSample {
    pub fn from_be_bytes(buf: &[u8; 6]) -> Self {
        AxisSample {
            x: combine_bytes(buf[0], buf[1]),
            y: combine_bytes(buf[2], buf[3]),
            z: combine_bytes(buf[4], buf[5]),
        }
    }
}

impl Sub<RawAxisSample> for RawAxisSample {
    type Output = CorrectedAxisSample;

    fn sub(self, baseline: RawAxisSample) -> Self::Output {
        AxisSample {
            x: self.x as i32 - baseline.x as i32,
            y: self.y as i32 - baseline.y as i32,
            z: self.z as i32 - baseline.z as i32,
        }
    }
}

/// One temporally consistent reading of both sensors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImuSample {
    pub accel: CorrectedAxisSample,
    pub gyro: CorrectedAxisSample,
    pub temperature_raw: i16,
}

pub trait ImuSensor {
    type Error: Debug;
}

pub trait Accelerometer: ImuSensor {
    fn read_accel_raw(&mut self) -> Result<RawAxisSample, Self::Error>;
}

pub trait Gyroscope: ImuSensor {
    fn read_gyro_raw(&mut self) -> Result<RawAxisSample, Self::Error>;
}

pub trait CombinedGyroscopeAccelerometer: ImuSensor {
    /// Reads both sensors in a single transaction and keeps the result as the latest sample.
    fn update_cached_sample(&mut self) -> Result<ImuSample, Self::Error>;

    /// Configured, verified and calibrated.
    fn is_ready(&self) -> bool;

    /// Full-scale ranges the cached sample was taken with.
    fn ranges(&self) -> (MpuAccelRange, MpuGyroRange);
}
