use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::{
    config::constants::{CALIBRATION_DELAY_MS, CALIBRATION_SAMPLES},
    drivers::{
        imu_sensors::{
            Accelerometer, CombinedGyroscopeAccelerometer, Gyroscope, ImuSample, ImuSensor,
            RawAxisSample,
        },
        register_bus::{BitField, RegisterBus},
    },
    util::error::ImuError,
};

use super::{
    calibration::{calculate_baseline, CalibrationBaseline},
    registers::{
        AccelGyroConfigRegister, ClockSource, InterruptRegister, LowPassFrequencyValues,
        MPUBitFields, MPURegisters, MpuAccelRange, MpuGyroRange, MpuPowerManagementRegister,
        AXIS_BLOCK_LEN, COMBINED_MEASURE_LEN, DEFAULT_SLAVE_ADDR,
    },
};

const TEMPERATURE_LSB_PER_DEGREE: f32 = 340.0;
const TEMPERATURE_OFFSET_DEGREES: f32 = 36.53;
const POWER_UP_DELAY_MS: u32 = 100;
const REGISTER_SETTLE_DELAY_MS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Unconfigured,
    /// Registers written and verified, baseline not measured yet.
    Configured,
    Ready,
    /// Configuration or calibration failed, nothing read from the sensor can be trusted.
    Faulted,
}

pub struct MPU6050Sensor<I>
where
    I: RegisterBus,
{
    pub(super) bus: I,
    pub(super) mpu_addr: u8,
    accel_range: MpuAccelRange,
    gyro_range: MpuGyroRange,
    low_pass_filter_freq: Option<LowPassFrequencyValues>,
    baseline: CalibrationBaseline,
    state: DriverState,
    latest_sample: Option<ImuSample>,
    pub(super) fifo_enabled: bool,
    pub(super) fifo_synchronised: bool,
}

impl<I> MPU6050Sensor<I>
where
    I: RegisterBus,
{
    pub fn new(bus: I) -> Self {
        Self::with_address(bus, DEFAULT_SLAVE_ADDR)
    }

    pub fn with_address(bus: I, mpu_addr: u8) -> Self {
        MPU6050Sensor {
            bus,
            mpu_addr,
            accel_range: MpuAccelRange::G2,
            gyro_range: MpuGyroRange::Deg250,
            low_pass_filter_freq: None,
            baseline: CalibrationBaseline::default(),
            state: DriverState::Unconfigured,
            latest_sample: None,
            fifo_enabled: false,
            fifo_synchronised: true,
        }
    }

    /// Ranges and filter take effect on the next `configure()`.
    pub fn with_ranges(mut self, accel_range: MpuAccelRange, gyro_range: MpuGyroRange) -> Self {
        self.accel_range = accel_range;
        self.gyro_range = gyro_range;
        self
    }

    pub fn with_low_pass_filter(mut self, low_pass_freq: LowPassFrequencyValues) -> Self {
        self.low_pass_filter_freq = Some(low_pass_freq);
        self
    }

    /// Wakes the sensor, applies ranges and filter, verifies every write by reading it
    /// back and then measures the at-rest baseline.
    ///
    /// Any failure leaves the driver `Faulted`.
    pub fn configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError<I::Error>> {
        match self.try_configure(delay) {
            Ok(()) => {
                info!(
                    "MPU6050 at {:#04x} ready, accel ±{}g gyro ±{}°/s baseline {:?}",
                    self.mpu_addr,
                    self.accel_range.range(),
                    self.gyro_range.range(),
                    self.baseline
                );
                Ok(())
            }
            Err(configure_error) => {
                self.state = DriverState::Faulted;
                error!("MPU6050 configuration failed: {}", configure_error);
                Err(configure_error)
            }
        }
    }

    fn try_configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError<I::Error>> {
        delay.delay_ms(POWER_UP_DELAY_MS);
        self.write_verified(
            MPURegisters::POWER_MANAGEMENT,
            MPUBitFields::CLOCK_SOURCE,
            ClockSource::PllGyroX as u8,
        )?;
        delay.delay_ms(REGISTER_SETTLE_DELAY_MS);
        self.write_verified(
            MPURegisters::GYRO_CONFIG,
            MPUBitFields::FULL_SCALE_SELECT,
            self.gyro_range.fs_sel(),
        )?;
        delay.delay_ms(REGISTER_SETTLE_DELAY_MS);
        self.write_verified(
            MPURegisters::ACCEL_CONFIG,
            MPUBitFields::FULL_SCALE_SELECT,
            self.accel_range.afs_sel(),
        )?;
        delay.delay_ms(REGISTER_SETTLE_DELAY_MS);
        if let Some(low_pass_freq) = self.low_pass_filter_freq {
            self.write_verified(
                MPURegisters::CONFIG,
                MPUBitFields::DIGITAL_LOW_PASS,
                low_pass_freq as u8,
            )?;
            delay.delay_ms(REGISTER_SETTLE_DELAY_MS);
        }
        self.write_verified(MPURegisters::POWER_MANAGEMENT, MPUBitFields::SLEEP, 0)?;
        delay.delay_ms(POWER_UP_DELAY_MS);

        self.state = DriverState::Configured;
        debug!("MPU6050 registers verified, calibrating");
        self.calibrate(delay)?;
        self.update_cached_sample()?;
        Ok(())
    }

    /// Measures the at-rest baseline, blocking for about a second.
    pub fn calibrate<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError<I::Error>> {
        self.ensure_configured()?;
        match calculate_baseline(self, delay, CALIBRATION_SAMPLES, CALIBRATION_DELAY_MS) {
            Ok(baseline) => {
                self.baseline = baseline;
                self.state = DriverState::Ready;
                info!("IMU calibrated with {:?}", baseline);
                Ok(())
            }
            Err(calibration_error) => {
                self.state = DriverState::Faulted;
                Err(calibration_error)
            }
        }
    }

    fn write_verified(
        &mut self,
        register: u8,
        field: BitField,
        value: u8,
    ) -> Result<(), ImuError<I::Error>> {
        self.bus
            .write_bits(self.mpu_addr, register, field, value)
            .map_err(ImuError::BusTransactionFailure)?;
        let found = self.read_register(register)?;
        if field.extract(found) != field.extract(field.insert(0, value)) {
            return Err(ImuError::VerificationFailed {
                register,
                expected: field.insert(found, value),
                found,
            });
        }
        Ok(())
    }

    fn ensure_configured(&self) -> Result<(), ImuError<I::Error>> {
        match self.state {
            DriverState::Configured | DriverState::Ready => Ok(()),
            DriverState::Unconfigured | DriverState::Faulted => {
                Err(ImuError::UninitializedSensor)
            }
        }
    }

    pub(super) fn read_register(&mut self, register: u8) -> Result<u8, ImuError<I::Error>> {
        self.bus
            .read_register(self.mpu_addr, register)
            .map_err(ImuError::BusTransactionFailure)
    }

    pub(super) fn read_block(
        &mut self,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), ImuError<I::Error>> {
        self.bus
            .read_registers(self.mpu_addr, register, buffer)
            .map_err(ImuError::BusTransactionFailure)
    }

    pub(super) fn write_register(
        &mut self,
        register: u8,
        value: u8,
    ) -> Result<(), ImuError<I::Error>> {
        self.bus
            .write_register(self.mpu_addr, register, value)
            .map_err(ImuError::BusTransactionFailure)
    }

    pub(super) fn write_bits(
        &mut self,
        register: u8,
        field: BitField,
        value: u8,
    ) -> Result<(), ImuError<I::Error>> {
        self.bus
            .write_bits(self.mpu_addr, register, field, value)
            .map_err(ImuError::BusTransactionFailure)
    }

    // Per-axis polling consumes the output registers the FIFO is also fed from.
    fn note_polled_read(&mut self) {
        if self.fifo_enabled {
            self.fifo_synchronised = false;
        }
    }

    fn read_axis_block(&mut self, register: u8) -> Result<RawAxisSample, ImuError<I::Error>> {
        self.ensure_configured()?;
        let mut buf = [0_u8; AXIS_BLOCK_LEN];
        self.read_block(register, &mut buf)?;
        self.note_polled_read();
        Ok(RawAxisSample::from_be_bytes(&buf))
    }

    pub fn read_temperature_raw(&mut self) -> Result<i16, ImuError<I::Error>> {
        self.ensure_configured()?;
        let mut buf = [0_u8; 2];
        self.read_block(MPURegisters::TEMP_MEASURE_START, &mut buf)?;
        self.note_polled_read();
        Ok(i16::from_be_bytes(buf))
    }

    pub fn read_temperature_celsius(&mut self) -> Result<f32, ImuError<I::Error>> {
        let raw = self.read_temperature_raw()?;
        Ok(raw_temperature_to_celsius(raw))
    }

    pub fn set_sleep(&mut self, sleep: bool) -> Result<(), ImuError<I::Error>> {
        self.write_bits(MPURegisters::POWER_MANAGEMENT, MPUBitFields::SLEEP, sleep as u8)
    }

    pub fn set_clock_source(&mut self, source: ClockSource) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::POWER_MANAGEMENT,
            MPUBitFields::CLOCK_SOURCE,
            source as u8,
        )
    }

    /// Sample rate = gyro output rate / (1 + `divider`).
    pub fn set_clock_divider(&mut self, divider: u8) -> Result<(), ImuError<I::Error>> {
        self.write_register(MPURegisters::SMPRT_DIV, divider)
    }

    /// Restores every register to its power-on value. The sensor has to be configured again.
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::POWER_MANAGEMENT,
            MPUBitFields::DEVICE_RESET,
            1,
        )?;
        self.state = DriverState::Unconfigured;
        self.latest_sample = None;
        self.fifo_enabled = false;
        self.fifo_synchronised = true;
        delay.delay_ms(POWER_UP_DELAY_MS);

        let found = self.read_register(MPURegisters::POWER_MANAGEMENT)?;
        if MpuPowerManagementRegister::from_bits(found).device_reset() {
            return Err(ImuError::VerificationFailed {
                register: MPURegisters::POWER_MANAGEMENT,
                expected: MPUBitFields::DEVICE_RESET.insert(found, 0),
                found,
            });
        }
        info!("MPU6050 reset");
        Ok(())
    }

    pub fn is_sleeping(&mut self) -> Result<bool, ImuError<I::Error>> {
        let power = self.read_register(MPURegisters::POWER_MANAGEMENT)?;
        Ok(MpuPowerManagementRegister::from_bits(power).sleep())
    }

    pub fn i2c_master_enable(&mut self, enable: bool) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::USER_CTRL,
            MPUBitFields::I2C_MASTER_ENABLE,
            enable as u8,
        )
    }

    pub fn i2c_master_reset(&mut self) -> Result<(), ImuError<I::Error>> {
        self.write_bits(MPURegisters::USER_CTRL, MPUBitFields::I2C_MASTER_RESET, 1)
    }

    pub fn enable_int_dataready(&mut self, enable: bool) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::INT_ENABLE,
            MPUBitFields::DATA_READY,
            enable as u8,
        )
    }

    /// Reading INT_STATUS clears the flags on the device.
    pub fn int_status(&mut self) -> Result<InterruptRegister, ImuError<I::Error>> {
        let status = self.read_register(MPURegisters::INT_STATUS)?;
        Ok(InterruptRegister::from_bits(status))
    }

    pub fn data_ready(&mut self) -> Result<bool, ImuError<I::Error>> {
        Ok(self.int_status()?.data_ready())
    }

    pub fn enable_low_pass_filter(
        &mut self,
        low_pass_freq: LowPassFrequencyValues,
    ) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::CONFIG,
            MPUBitFields::DIGITAL_LOW_PASS,
            low_pass_freq as u8,
        )?;
        self.low_pass_filter_freq = Some(low_pass_freq);
        Ok(())
    }

    /// A baseline measured in another range no longer matches, the driver has to be
    /// calibrated again before it is ready.
    pub fn set_gyro_range(&mut self, range: MpuGyroRange) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::GYRO_CONFIG,
            MPUBitFields::FULL_SCALE_SELECT,
            range.fs_sel(),
        )?;
        if range != self.gyro_range {
            self.gyro_range = range;
            self.invalidate_calibration();
        }
        Ok(())
    }

    pub fn set_accel_range(&mut self, range: MpuAccelRange) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::ACCEL_CONFIG,
            MPUBitFields::FULL_SCALE_SELECT,
            range.afs_sel(),
        )?;
        if range != self.accel_range {
            self.accel_range = range;
            self.invalidate_calibration();
        }
        Ok(())
    }

    pub fn set_gyro_range_selector(&mut self, fs_sel: u8) -> Result<(), ImuError<I::Error>> {
        let range = MpuGyroRange::try_from(fs_sel).map_err(ImuError::RangeMisconfiguration)?;
        self.set_gyro_range(range)
    }

    pub fn set_accel_range_selector(&mut self, afs_sel: u8) -> Result<(), ImuError<I::Error>> {
        let range = MpuAccelRange::try_from(afs_sel).map_err(ImuError::RangeMisconfiguration)?;
        self.set_accel_range(range)
    }

    /// Range currently selected on the device, as read from GYRO_CONFIG.
    pub fn read_gyro_range(&mut self) -> Result<MpuGyroRange, ImuError<I::Error>> {
        let config =
            AccelGyroConfigRegister::from_bits(self.read_register(MPURegisters::GYRO_CONFIG)?);
        MpuGyroRange::try_from(config.fs_sel()).map_err(ImuError::RangeMisconfiguration)
    }

    pub fn read_accel_range(&mut self) -> Result<MpuAccelRange, ImuError<I::Error>> {
        let config =
            AccelGyroConfigRegister::from_bits(self.read_register(MPURegisters::ACCEL_CONFIG)?);
        MpuAccelRange::try_from(config.fs_sel()).map_err(ImuError::RangeMisconfiguration)
    }

    fn invalidate_calibration(&mut self) {
        if self.state == DriverState::Ready {
            warn!("IMU range changed after calibration, recalibration required");
            self.state = DriverState::Configured;
            self.latest_sample = None;
        }
    }

    pub fn accel_range(&self) -> MpuAccelRange {
        self.accel_range
    }

    pub fn gyro_range(&self) -> MpuGyroRange {
        self.gyro_range
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn baseline(&self) -> CalibrationBaseline {
        self.baseline
    }

    /// Last sample stored by `update_cached_sample`.
    pub fn latest_sample(&self) -> Option<ImuSample> {
        self.latest_sample
    }

    pub fn address(&self) -> u8 {
        self.mpu_addr
    }

    pub fn bus_mut(&mut self) -> &mut I {
        &mut self.bus
    }

    pub fn release(self) -> I {
        self.bus
    }
}

pub fn raw_temperature_to_celsius(raw: i16) -> f32 {
    raw as f32 / TEMPERATURE_LSB_PER_DEGREE + TEMPERATURE_OFFSET_DEGREES
}

impl<I> ImuSensor for MPU6050Sensor<I>
where
    I: RegisterBus,
{
    type Error = ImuError<I::Error>;
}

impl<I> Accelerometer for MPU6050Sensor<I>
where
    I: RegisterBus,
{
    fn read_accel_raw(&mut self) -> Result<RawAxisSample, Self::Error> {
        self.read_axis_block(MPURegisters::ACCEL_MEASURE_START)
    }
}

impl<I> Gyroscope for MPU6050Sensor<I>
where
    I: RegisterBus,
{
    fn read_gyro_raw(&mut self) -> Result<RawAxisSample, Self::Error> {
        self.read_axis_block(MPURegisters::GYRO_MEASURE_START)
    }
}

impl<I> CombinedGyroscopeAccelerometer for MPU6050Sensor<I>
where
    I: RegisterBus,
{
    fn update_cached_sample(&mut self) -> Result<ImuSample, Self::Error> {
        if self.state != DriverState::Ready {
            return Err(ImuError::UninitializedSensor);
        }

        let mut buf = [0_u8; COMBINED_MEASURE_LEN];
        self.read_block(MPURegisters::ACCEL_MEASURE_START, &mut buf)?;
        self.note_polled_read();

        let mut accel = [0_u8; AXIS_BLOCK_LEN];
        let mut gyro = [0_u8; AXIS_BLOCK_LEN];
        accel.copy_from_slice(&buf[0..6]);
        gyro.copy_from_slice(&buf[8..14]);

        let sample = self.baseline.correct(
            RawAxisSample::from_be_bytes(&accel),
            RawAxisSample::from_be_bytes(&gyro),
            i16::from_be_bytes([buf[6], buf[7]]),
        );
        self.latest_sample = Some(sample);
        Ok(sample)
    }

    fn is_ready(&self) -> bool {
        self.state == DriverState::Ready
    }

    fn ranges(&self) -> (MpuAccelRange, MpuGyroRange) {
        (self.accel_range, self.gyro_range)
    }
}
