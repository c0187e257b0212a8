use core::fmt::Debug;

use embedded_hal::i2c::I2c;

/// A run of bits inside an 8 bit register. `offset` is the position of the lowest bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub offset: u8,
    pub width: u8,
}

impl BitField {
    pub const fn new(offset: u8, width: u8) -> Self {
        BitField { offset, width }
    }

    pub const fn bit(offset: u8) -> Self {
        BitField { offset, width: 1 }
    }

    pub const fn mask(&self) -> u8 {
        (((1_u16 << self.width) - 1) << self.offset) as u8
    }

    /// Replaces the field bits of `register` with `value`, every other bit is kept.
    pub const fn insert(&self, register: u8, value: u8) -> u8 {
        let mask = self.mask();
        (register & !mask) | ((value << self.offset) & mask)
    }

    pub const fn extract(&self, register: u8) -> u8 {
        (register & self.mask()) >> self.offset
    }
}

/// Register level access to a device sitting on a shared bus.
///
/// Every call is one blocking transaction (or one read followed by one write for the
/// bit-field helpers). There is no retry, failures go straight back to the caller.
pub trait RegisterBus {
    type Error: Debug;

    fn write_register(&mut self, device: u8, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Reads `buffer.len()` bytes starting at `register`, relying on the device's
    /// address auto-increment.
    fn read_registers(
        &mut self,
        device: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;

    fn read_register(&mut self, device: u8, register: u8) -> Result<u8, Self::Error> {
        let mut buffer = [0_u8; 1];
        self.read_registers(device, register, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Read-modify-write of a bit field. Nothing is written if the read fails.
    fn write_bits(
        &mut self,
        device: u8,
        register: u8,
        field: BitField,
        value: u8,
    ) -> Result<(), Self::Error> {
        let current = self.read_register(device, register)?;
        self.write_register(device, register, field.insert(current, value))
    }

    fn write_bit(
        &mut self,
        device: u8,
        register: u8,
        bit: u8,
        enabled: bool,
    ) -> Result<(), Self::Error> {
        self.write_bits(device, register, BitField::bit(bit), enabled as u8)
    }
}

impl<I> RegisterBus for I
where
    I: I2c,
{
    type Error = I::Error;

    fn write_register(&mut self, device: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        self.write(device, &[register, value])
    }

    fn read_registers(
        &mut self,
        device: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_read(device, &[register], buffer)
    }
}
