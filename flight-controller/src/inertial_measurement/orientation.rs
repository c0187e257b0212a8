use crate::{
    drivers::{
        imu_sensors::{CorrectedAxisSample, ImuSample},
        mpu_6050::registers::{MpuAccelRange, MpuGyroRange},
    },
    util::math::vectors::{AccelerationVector3D, RotationVector2D, RotationVector3D, TiltAngles},
};

/// Fixed bias and sign fix for one gyro axis, applied after scaling to °/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroAxisCorrection {
    pub bias_deg_per_sec: f32,
    pub invert: bool,
}

impl GyroAxisCorrection {
    pub const NONE: Self = Self::new(0.0, false);

    pub const fn new(bias_deg_per_sec: f32, invert: bool) -> Self {
        Self {
            bias_deg_per_sec,
            invert,
        }
    }

    pub fn apply(&self, rate: f32) -> f32 {
        let corrected = rate - self.bias_deg_per_sec;
        if self.invert {
            -corrected
        } else {
            corrected
        }
    }
}

/// Per-axis corrections. Gyro x is roll, y is pitch, z is yaw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroCorrections {
    pub roll: GyroAxisCorrection,
    pub pitch: GyroAxisCorrection,
    pub yaw: GyroAxisCorrection,
}

impl GyroCorrections {
    /// The pitch axis of the reference airframe reads 2.5 °/s high and is mounted reversed.
    pub const AIRFRAME_DEFAULT: Self = Self {
        roll: GyroAxisCorrection::NONE,
        pitch: GyroAxisCorrection::new(2.5, true),
        yaw: GyroAxisCorrection::NONE,
    };

    pub const NONE: Self = Self {
        roll: GyroAxisCorrection::NONE,
        pitch: GyroAxisCorrection::NONE,
        yaw: GyroAxisCorrection::NONE,
    };
}

impl Default for GyroCorrections {
    fn default() -> Self {
        Self::AIRFRAME_DEFAULT
    }
}

/// Attitude derived from one sample. Nothing carries over between cycles.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AttitudeEstimate {
    /// Degrees.
    pub roll: f32,
    pub pitch: f32,
    /// x/y pair angle, not a heading. Yaw is only controlled through `rates.yaw`.
    pub yaw_tilt: f32,
    /// Degrees per second.
    pub rates: RotationVector3D,
}

impl AttitudeEstimate {
    pub fn angles(&self) -> RotationVector2D {
        RotationVector2D {
            roll: self.roll,
            pitch: self.pitch,
        }
    }
}

/// Converts corrected counts into tilt angles and rotation rates.
///
/// The calibration baseline is taken at rest, so it also cancels gravity. With
/// `gravity_reference` on, one g is added back on z before the tilt angles are computed,
/// so a level aircraft sees `(0, 0, 1g)` instead of a zero vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationEstimator {
    accel_range: MpuAccelRange,
    gyro_range: MpuGyroRange,
    gravity_reference: bool,
    corrections: GyroCorrections,
}

impl OrientationEstimator {
    pub fn new(accel_range: MpuAccelRange, gyro_range: MpuGyroRange) -> Self {
        Self {
            accel_range,
            gyro_range,
            gravity_reference: true,
            corrections: GyroCorrections::default(),
        }
    }

    pub fn with_gravity_reference(mut self, enabled: bool) -> Self {
        self.gravity_reference = enabled;
        self
    }

    pub fn with_corrections(mut self, corrections: GyroCorrections) -> Self {
        self.corrections = corrections;
        self
    }

    pub fn set_ranges(&mut self, accel_range: MpuAccelRange, gyro_range: MpuGyroRange) {
        self.accel_range = accel_range;
        self.gyro_range = gyro_range;
    }

    pub fn corrections(&self) -> GyroCorrections {
        self.corrections
    }

    pub fn acceleration_vector(&self, accel: &CorrectedAxisSample) -> AccelerationVector3D {
        let sensitivity = self.accel_range.sensitivity() as f32;
        let gravity = if self.gravity_reference { 1.0 } else { 0.0 };
        AccelerationVector3D {
            x: accel.x as f32 / sensitivity,
            y: accel.y as f32 / sensitivity,
            z: accel.z as f32 / sensitivity + gravity,
        }
    }

    pub fn tilt_angles(&self, accel: &CorrectedAxisSample) -> TiltAngles {
        self.acceleration_vector(accel)
            .calculate_orientation_angles()
    }

    pub fn rotation_rates(&self, gyro: &CorrectedAxisSample) -> RotationVector3D {
        let sensitivity = self.gyro_range.sensitivity();
        RotationVector3D {
            roll: self.corrections.roll.apply(gyro.x as f32 / sensitivity),
            pitch: self.corrections.pitch.apply(gyro.y as f32 / sensitivity),
            yaw: self.corrections.yaw.apply(gyro.z as f32 / sensitivity),
        }
    }

    pub fn estimate(&self, sample: &ImuSample) -> AttitudeEstimate {
        let tilt = self.tilt_angles(&sample.accel);
        AttitudeEstimate {
            roll: tilt.roll,
            pitch: tilt.pitch,
            yaw_tilt: tilt.yaw_tilt,
            rates: self.rotation_rates(&sample.gyro),
        }
    }
}
