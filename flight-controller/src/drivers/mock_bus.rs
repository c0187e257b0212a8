//! Simulated MPU-6050 on an I2C bus, for tests.
//!
//! Models the register file with address auto-increment, the self-clearing reset bits,
//! the FIFO data port and a queue of telemetry samples that is consumed every time a read
//! starts at ACCEL_XOUT_H.

use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use super::mpu_6050::registers::{MPUBitFields, MPURegisters, UserControlRegister};

const REGISTER_COUNT: usize = 128;
const POWER_ON_PWR_MGMT_1: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBusError {
    Nack,
    Bus,
}

impl i2c::Error for MockBusError {
    fn kind(&self) -> ErrorKind {
        match self {
            MockBusError::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            MockBusError::Bus => ErrorKind::Bus,
        }
    }
}

#[derive(Debug)]
pub struct MockMpuBus {
    address: u8,
    registers: [u8; REGISTER_COUNT],
    pointer: u8,
    fifo: VecDeque<u8>,
    samples: VecDeque<[u8; 14]>,
    register_writes: Vec<(u8, u8)>,
    read_transactions: usize,
    fail_reads: bool,
    fail_writes: bool,
    frozen_registers: Vec<u8>,
}

impl MockMpuBus {
    pub fn new(address: u8) -> Self {
        let mut registers = [0_u8; REGISTER_COUNT];
        registers[MPURegisters::POWER_MANAGEMENT as usize] = POWER_ON_PWR_MGMT_1;
        registers[MPURegisters::WHO_AM_I as usize] = 0x68;
        MockMpuBus {
            address,
            registers,
            pointer: 0,
            fifo: VecDeque::new(),
            samples: VecDeque::new(),
            register_writes: Vec::new(),
            read_transactions: 0,
            fail_reads: false,
            fail_writes: false,
            frozen_registers: Vec::new(),
        }
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    pub fn set_register(&mut self, register: u8, value: u8) {
        self.registers[register as usize] = value;
    }

    /// Register writes in order, as `(register, value)`.
    pub fn register_writes(&self) -> &[(u8, u8)] {
        &self.register_writes
    }

    pub fn read_transactions(&self) -> usize {
        self.read_transactions
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Writes to `register` are acknowledged but do not change its value.
    pub fn freeze_register(&mut self, register: u8) {
        self.frozen_registers.push(register);
    }

    /// Loads accel, temperature and gyro output registers right away.
    pub fn set_measurements(&mut self, accel: [i16; 3], temperature: i16, gyro: [i16; 3]) {
        let block = Self::measurement_block(accel, temperature, gyro);
        let start = MPURegisters::ACCEL_MEASURE_START as usize;
        self.registers[start..start + block.len()].copy_from_slice(&block);
    }

    /// Queues a measurement that becomes visible on the next read starting at ACCEL_XOUT_H.
    pub fn queue_measurement(&mut self, accel: [i16; 3], temperature: i16, gyro: [i16; 3]) {
        self.samples
            .push_back(Self::measurement_block(accel, temperature, gyro));
    }

    pub fn push_fifo(&mut self, bytes: &[u8]) {
        self.fifo.extend(bytes.iter().copied());
    }

    pub fn fifo_len(&self) -> usize {
        self.fifo.len()
    }

    fn measurement_block(accel: [i16; 3], temperature: i16, gyro: [i16; 3]) -> [u8; 14] {
        let mut block = [0_u8; 14];
        let words = [accel[0], accel[1], accel[2], temperature, gyro[0], gyro[1], gyro[2]];
        for (index, word) in words.iter().enumerate() {
            block[index * 2..index * 2 + 2].copy_from_slice(&word.to_be_bytes());
        }
        block
    }

    fn store(&mut self, register: u8, value: u8) {
        self.register_writes.push((register, value));
        if self.frozen_registers.contains(&register) {
            return;
        }

        match register {
            MPURegisters::POWER_MANAGEMENT if MPUBitFields::DEVICE_RESET.extract(value) == 1 => {
                let who_am_i = self.registers[MPURegisters::WHO_AM_I as usize];
                self.registers = [0_u8; REGISTER_COUNT];
                self.registers[MPURegisters::POWER_MANAGEMENT as usize] = POWER_ON_PWR_MGMT_1;
                self.registers[MPURegisters::WHO_AM_I as usize] = who_am_i;
                self.fifo.clear();
            }
            MPURegisters::USER_CTRL => {
                let control = UserControlRegister::from_bits(value);
                if control.fifo_reset() {
                    self.fifo.clear();
                }
                // Reset bits clear themselves once the reset is done.
                self.registers[register as usize] = control
                    .with_fifo_reset(false)
                    .with_i2c_mst_reset(false)
                    .with_sig_cond_reset(false)
                    .into_bits();
            }
            MPURegisters::FIFO_R_W => self.fifo.push_back(value),
            _ => self.registers[register as usize] = value,
        }
    }

    fn load(&mut self) -> u8 {
        match self.pointer {
            MPURegisters::FIFO_R_W => self.fifo.pop_front().unwrap_or(0),
            register => {
                let value = match register {
                    MPURegisters::FIFO_COUNT_H => (self.fifo.len() as u16).to_be_bytes()[0],
                    MPURegisters::FIFO_COUNT_L => (self.fifo.len() as u16).to_be_bytes()[1],
                    _ => self.registers[register as usize % REGISTER_COUNT],
                };
                self.pointer = self.pointer.wrapping_add(1);
                value
            }
        }
    }
}

impl ErrorType for MockMpuBus {
    type Error = MockBusError;
}

impl I2c for MockMpuBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(MockBusError::Nack);
        }

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    let Some((register, data)) = bytes.split_first() else {
                        continue;
                    };
                    if self.fail_writes && !data.is_empty() {
                        return Err(MockBusError::Bus);
                    }
                    self.pointer = *register;
                    for value in data {
                        let register = self.pointer;
                        self.store(register, *value);
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
                Operation::Read(buffer) => {
                    if self.fail_reads {
                        return Err(MockBusError::Bus);
                    }
                    self.read_transactions += 1;
                    if self.pointer == MPURegisters::ACCEL_MEASURE_START {
                        if let Some(block) = self.samples.pop_front() {
                            let start = MPURegisters::ACCEL_MEASURE_START as usize;
                            self.registers[start..start + block.len()].copy_from_slice(&block);
                        }
                    }
                    for slot in buffer.iter_mut() {
                        *slot = self.load();
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and keeps count of the time it was asked to wait.
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl MockDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}
