//! Bulk reads through the on-chip FIFO.
//!
//! Polling the output registers while the FIFO is running leaves bytes in it that no longer
//! line up with frame boundaries. Reads are refused until `fifo_reset()` runs again.

use crate::{
    drivers::{
        imu_sensors::{CombinedGyroscopeAccelerometer, ImuSample, RawAxisSample},
        register_bus::RegisterBus,
    },
    util::error::ImuError,
};

use super::{
    device::MPU6050Sensor,
    registers::{FifoEnableMask, MPUBitFields, MPURegisters, AXIS_BLOCK_LEN, FIFO_FRAME_LEN},
};

const PACKET_CHUNK_LEN: usize = 32;

impl<I> MPU6050Sensor<I>
where
    I: RegisterBus,
{
    pub fn fifo_enable(&mut self, enable: bool) -> Result<(), ImuError<I::Error>> {
        self.write_bits(
            MPURegisters::USER_CTRL,
            MPUBitFields::FIFO_ENABLE,
            enable as u8,
        )?;
        self.fifo_enabled = enable;
        if enable {
            self.fifo_synchronised = false;
        }
        Ok(())
    }

    pub fn fifo_reset(&mut self) -> Result<(), ImuError<I::Error>> {
        self.write_bits(MPURegisters::USER_CTRL, MPUBitFields::FIFO_RESET, 1)?;
        self.fifo_synchronised = true;
        Ok(())
    }

    /// Selects which outputs get pushed into the FIFO on every sample.
    pub fn fifo_enable_data(&mut self, mask: FifoEnableMask) -> Result<(), ImuError<I::Error>> {
        self.write_register(MPURegisters::FIFO_EN, mask.bits())
    }

    /// Bytes currently buffered.
    pub fn fifo_count(&mut self) -> Result<u16, ImuError<I::Error>> {
        let mut buf = [0_u8; 2];
        self.read_block(MPURegisters::FIFO_COUNT_H, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn is_fifo_synchronised(&self) -> bool {
        self.fifo_synchronised
    }

    fn ensure_fifo_synchronised(&self) -> Result<(), ImuError<I::Error>> {
        if self.fifo_synchronised {
            Ok(())
        } else {
            Err(ImuError::FifoNotSynchronised)
        }
    }

    /// Fills `buffer` from the FIFO data port. The caller checks `fifo_count()` first.
    pub fn fifo_read(&mut self, buffer: &mut [u8]) -> Result<(), ImuError<I::Error>> {
        self.ensure_fifo_synchronised()?;
        self.read_block(MPURegisters::FIFO_R_W, buffer)
    }

    /// Reads as many big-endian words as are buffered and fit in `packets`.
    pub fn fifo_read_packets(&mut self, packets: &mut [i16]) -> Result<usize, ImuError<I::Error>> {
        self.ensure_fifo_synchronised()?;
        let available = (self.fifo_count()? / 2) as usize;
        let total = available.min(packets.len());

        let mut chunk = [0_u8; PACKET_CHUNK_LEN];
        let mut read = 0;
        while read < total {
            let words = (total - read).min(PACKET_CHUNK_LEN / 2);
            let bytes = &mut chunk[..words * 2];
            self.read_block(MPURegisters::FIFO_R_W, bytes)?;
            for (slot, pair) in packets[read..read + words]
                .iter_mut()
                .zip(bytes.chunks_exact(2))
            {
                *slot = i16::from_be_bytes([pair[0], pair[1]]);
            }
            read += words;
        }
        Ok(total)
    }

    /// Decodes whole accel + gyro frames, as buffered with [`FifoEnableMask::GYRO_ACCEL`].
    ///
    /// Samples are baseline corrected, the FIFO frame carries no temperature.
    pub fn fifo_read_samples(
        &mut self,
        samples: &mut [ImuSample],
    ) -> Result<usize, ImuError<I::Error>> {
        if !self.is_ready() {
            return Err(ImuError::UninitializedSensor);
        }
        self.ensure_fifo_synchronised()?;
        let available = self.fifo_count()? as usize / FIFO_FRAME_LEN;
        let total = available.min(samples.len());

        let mut frame = [0_u8; FIFO_FRAME_LEN];
        let mut accel = [0_u8; AXIS_BLOCK_LEN];
        let mut gyro = [0_u8; AXIS_BLOCK_LEN];
        for slot in samples.iter_mut().take(total) {
            self.read_block(MPURegisters::FIFO_R_W, &mut frame)?;
            accel.copy_from_slice(&frame[..AXIS_BLOCK_LEN]);
            gyro.copy_from_slice(&frame[AXIS_BLOCK_LEN..]);
            *slot = self.baseline().correct(
                RawAxisSample::from_be_bytes(&accel),
                RawAxisSample::from_be_bytes(&gyro),
                0,
            );
        }
        Ok(total)
    }
}
