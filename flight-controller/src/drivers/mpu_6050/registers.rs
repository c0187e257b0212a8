use bitfield_struct::bitfield;
use bitflags::bitflags;

use crate::drivers::register_bus::BitField;

pub const DEFAULT_SLAVE_ADDR: u8 = 0x68;

pub struct MPURegisters;
impl MPURegisters {
    pub const SMPRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;
    pub const FIFO_EN: u8 = 0x23;
    pub const INT_ENABLE: u8 = 0x38;
    pub const INT_STATUS: u8 = 0x3A;
    pub const ACCEL_MEASURE_START: u8 = 0x3B;
    pub const TEMP_MEASURE_START: u8 = 0x41;
    pub const GYRO_MEASURE_START: u8 = 0x43;
    pub const USER_CTRL: u8 = 0x6A;
    pub const POWER_MANAGEMENT: u8 = 0x6B;
    pub const FIFO_COUNT_H: u8 = 0x72;
    pub const FIFO_COUNT_L: u8 = 0x73;
    pub const FIFO_R_W: u8 = 0x74;
    pub const WHO_AM_I: u8 = 0x75;
}

pub struct MPUBitFields;
impl MPUBitFields {
    // PWR_MGMT_1
    pub const DEVICE_RESET: BitField = BitField::bit(7);
    pub const SLEEP: BitField = BitField::bit(6);
    pub const CLOCK_SOURCE: BitField = BitField::new(0, 3);
    // USER_CTRL
    pub const FIFO_ENABLE: BitField = BitField::bit(6);
    pub const I2C_MASTER_ENABLE: BitField = BitField::bit(5);
    pub const FIFO_RESET: BitField = BitField::bit(2);
    pub const I2C_MASTER_RESET: BitField = BitField::bit(1);
    // INT_ENABLE / INT_STATUS
    pub const DATA_READY: BitField = BitField::bit(0);
    // GYRO_CONFIG / ACCEL_CONFIG
    pub const FULL_SCALE_SELECT: BitField = BitField::new(3, 2);
    // CONFIG
    pub const DIGITAL_LOW_PASS: BitField = BitField::new(0, 3);
}

/// Size of the combined accel + temperature + gyro block starting at ACCEL_XOUT_H.
pub const COMBINED_MEASURE_LEN: usize = 14;
pub const AXIS_BLOCK_LEN: usize = 6;
/// One FIFO frame with accel and all gyro axes enabled.
pub const FIFO_FRAME_LEN: usize = 12;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    Internal8MHz = 0x0,
    PllGyroX = 0x1,
    PllGyroY = 0x2,
    PllGyroZ = 0x3,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpuGyroRange {
    Deg250 = 0x0,
    Deg500 = 0x1,
    Deg1000 = 0x2,
    Deg2000 = 0x3,
}

impl MpuGyroRange {
    pub const fn fs_sel(self) -> u8 {
        self as u8
    }

    /// Full scale in degrees per second.
    pub const fn range(self) -> u16 {
        match self {
            MpuGyroRange::Deg250 => 250,
            MpuGyroRange::Deg500 => 500,
            MpuGyroRange::Deg1000 => 1000,
            MpuGyroRange::Deg2000 => 2000,
        }
    }

    /// LSB per degree per second.
    pub const fn sensitivity(self) -> f32 {
        match self {
            MpuGyroRange::Deg250 => 131.0,
            MpuGyroRange::Deg500 => 65.5,
            MpuGyroRange::Deg1000 => 32.8,
            MpuGyroRange::Deg2000 => 16.4,
        }
    }
}

impl TryFrom<u8> for MpuGyroRange {
    type Error = u8;

    fn try_from(fs_sel: u8) -> Result<Self, Self::Error> {
        match fs_sel {
            0x0 => Ok(MpuGyroRange::Deg250),
            0x1 => Ok(MpuGyroRange::Deg500),
            0x2 => Ok(MpuGyroRange::Deg1000),
            0x3 => Ok(MpuGyroRange::Deg2000),
            _ => Err(fs_sel),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpuAccelRange {
    G2 = 0x0,
    G4 = 0x1,
    G8 = 0x2,
    G16 = 0x3,
}

impl MpuAccelRange {
    pub const fn afs_sel(self) -> u8 {
        self as u8
    }

    /// Full scale in g.
    pub const fn range(self) -> u8 {
        match self {
            MpuAccelRange::G2 => 2,
            MpuAccelRange::G4 => 4,
            MpuAccelRange::G8 => 8,
            MpuAccelRange::G16 => 16,
        }
    }

    /// LSB per g.
    pub const fn sensitivity(self) -> u16 {
        match self {
            MpuAccelRange::G2 => 16384,
            MpuAccelRange::G4 => 8192,
            MpuAccelRange::G8 => 4096,
            MpuAccelRange::G16 => 2048,
        }
    }
}

impl TryFrom<u8> for MpuAccelRange {
    type Error = u8;

    fn try_from(afs_sel: u8) -> Result<Self, Self::Error> {
        match afs_sel {
            0x0 => Ok(MpuAccelRange::G2),
            0x1 => Ok(MpuAccelRange::G4),
            0x2 => Ok(MpuAccelRange::G8),
            0x3 => Ok(MpuAccelRange::G16),
            _ => Err(afs_sel),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowPassFrequencyValues {
    None = 0x0,
    Freq184Hz = 0x1,
    Freq94Hz = 0x2,
    Freq44Hz = 0x3,
    Freq21Hz = 0x4,
    Freq10Hz = 0x5,
    Freq5Hz = 0x6,
}

bitflags! {
    /// FIFO_EN, which sensor outputs get pushed into the FIFO.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoEnableMask: u8 {
        const TEMPERATURE = 0b1000_0000;
        const GYRO_X = 0b0100_0000;
        const GYRO_Y = 0b0010_0000;
        const GYRO_Z = 0b0001_0000;
        const ACCEL = 0b0000_1000;
        const SLAVE_2 = 0b0000_0100;
        const SLAVE_1 = 0b0000_0010;
        const SLAVE_0 = 0b0000_0001;
        const GYRO_ACCEL = Self::GYRO_X.bits() | Self::GYRO_Y.bits() | Self::GYRO_Z.bits() | Self::ACCEL.bits();
    }
}

#[bitfield(u8)]
pub struct AccelGyroConfigRegister {
    #[bits(3)]
    pub pad: u8,
    #[bits(2)]
    pub fs_sel: u8,
    pub z_self_test: bool,
    pub y_self_test: bool,
    pub x_self_test: bool,
}

///See docs for register 107
#[bitfield(u8)]
pub struct MpuPowerManagementRegister {
    #[bits(3)]
    pub clock_sel: u8,
    pub temp_sensor_disable: bool,
    pub padding_bit: bool, // Set to zero
    pub cycle: bool,
    pub sleep: bool,
    pub device_reset: bool,
}

///See docs for register 106
#[bitfield(u8)]
pub struct UserControlRegister {
    pub sig_cond_reset: bool,
    pub i2c_mst_reset: bool,
    pub fifo_reset: bool,
    pub padding_bit: bool,
    pub i2c_if_dis: bool,
    pub i2c_mst_en: bool,
    pub fifo_en: bool,
    pub padding_high_bit: bool,
}

/// Shared layout of INT_ENABLE (56) and INT_STATUS (58).
#[bitfield(u8)]
pub struct InterruptRegister {
    pub data_ready: bool,
    #[bits(2)]
    pub pad: u8,
    pub i2c_mst_int: bool,
    pub fifo_overflow: bool,
    #[bits(3)]
    pub pad_high: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitfield_structs_match_register_map() {
        let power = MpuPowerManagementRegister::new()
            .with_clock_sel(ClockSource::PllGyroX as u8)
            .with_sleep(true);
        assert_eq!(power.into_bits(), 0b0100_0001);
        assert_eq!(
            MPUBitFields::CLOCK_SOURCE.extract(power.into_bits()),
            ClockSource::PllGyroX as u8
        );

        let gyro_config =
            AccelGyroConfigRegister::new().with_fs_sel(MpuGyroRange::Deg2000.fs_sel());
        assert_eq!(gyro_config.into_bits(), 0b0001_1000);
        assert_eq!(
            MPUBitFields::FULL_SCALE_SELECT.extract(gyro_config.into_bits()),
            0x3
        );

        let user_control = UserControlRegister::new().with_fifo_en(true).with_fifo_reset(true);
        assert_eq!(user_control.into_bits(), 0b0100_0100);
    }

    #[test]
    fn range_selectors_outside_two_bits_are_rejected() {
        assert_eq!(MpuGyroRange::try_from(2), Ok(MpuGyroRange::Deg1000));
        assert_eq!(MpuGyroRange::try_from(4), Err(4));
        assert_eq!(MpuAccelRange::try_from(3), Ok(MpuAccelRange::G16));
        assert_eq!(MpuAccelRange::try_from(7), Err(7));
    }
}
