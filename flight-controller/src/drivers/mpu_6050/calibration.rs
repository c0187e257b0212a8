use embedded_hal::delay::DelayNs;
use log::debug;

use crate::drivers::imu_sensors::{
    Accelerometer, CorrectedAxisSample, Gyroscope, ImuSample, RawAxisSample,
};

/// At-rest offsets, subtracted from every reading once calibration is done.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationBaseline {
    pub accel: RawAxisSample,
    pub gyro: RawAxisSample,
}

impl CalibrationBaseline {
    pub fn correct_accel(&self, raw: RawAxisSample) -> CorrectedAxisSample {
        raw - self.accel
    }

    pub fn correct_gyro(&self, raw: RawAxisSample) -> CorrectedAxisSample {
        raw - self.gyro
    }

    pub fn correct(
        &self,
        accel: RawAxisSample,
        gyro: RawAxisSample,
        temperature_raw: i16,
    ) -> ImuSample {
        ImuSample {
            accel: self.correct_accel(accel),
            gyro: self.correct_gyro(gyro),
            temperature_raw,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct AxisSum {
    x: i32,
    y: i32,
    z: i32,
}

impl AxisSum {
    fn add(&mut self, sample: RawAxisSample) {
        self.x += sample.x as i32;
        self.y += sample.y as i32;
        self.z += sample.z as i32;
    }

    // Integer division truncates toward zero, negative means included.
    fn mean(&self, count: i32) -> RawAxisSample {
        RawAxisSample {
            x: (self.x / count) as i16,
            y: (self.y / count) as i16,
            z: (self.z / count) as i16,
        }
    }
}

/// Running per-axis sums of at-rest samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaselineAccumulator {
    accel: AxisSum,
    gyro: AxisSum,
    count: i32,
}

impl BaselineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, accel: RawAxisSample, gyro: RawAxisSample) {
        self.accel.add(accel);
        self.gyro.add(gyro);
        self.count += 1;
    }

    pub fn sample_count(&self) -> i32 {
        self.count
    }

    /// Mean of everything added so far, a zero baseline when nothing was added.
    pub fn finish(&self) -> CalibrationBaseline {
        if self.count == 0 {
            return CalibrationBaseline::default();
        }
        CalibrationBaseline {
            accel: self.accel.mean(self.count),
            gyro: self.gyro.mean(self.count),
        }
    }
}

/// Averages `samples` raw readings of both sensors, waiting `interval_ms` after each one.
///
/// Blocks for `samples * interval_ms`. The vehicle has to be still, nothing here checks it.
pub fn calculate_baseline<S, D>(
    sensor: &mut S,
    delay: &mut D,
    samples: u8,
    interval_ms: u32,
) -> Result<CalibrationBaseline, S::Error>
where
    S: Accelerometer + Gyroscope,
    D: DelayNs,
{
    let mut accumulator = BaselineAccumulator::new();
    for _ in 0..samples {
        let accel = sensor.read_accel_raw()?;
        let gyro = sensor.read_gyro_raw()?;
        debug!("Calibration sample accel {:?} gyro {:?}", accel, gyro);
        accumulator.add(accel, gyro);
        delay.delay_ms(interval_ms);
    }
    Ok(accumulator.finish())
}
