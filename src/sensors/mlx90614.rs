//! Melexis MLX90614 infrared thermometer over I²C (SMBus-compatible).
//!
//! ## Registers (RAM, read via the SMBus "read word" command)
//!
//! | Command | Register | Content                      |
//! |---------|----------|------------------------------|
//! | `0x06`  | Ta       | die (ambient) temperature    |
//! | `0x07`  | Tobj1    | object temperature, zone 1   |
//! | `0x08`  | Tobj2    | object temperature, zone 2   |
//!
//! Each word is little-endian, 0.02 K per LSB.  The PEC byte the device
//! can append is not requested.
//!
//! Generic over [`embedded_hal::i2c::I2c`], so the same driver runs on the
//! ESP-IDF `I2cDriver` and on test doubles.

use embedded_hal::i2c::{Error as _, I2c};
use log::warn;

use crate::app::ports::TemperaturePort;
use crate::error::SensorFault;
use crate::sensors::TemperatureReading;

/// Factory-default SMBus address.
pub const DEFAULT_ADDRESS: u8 = 0x5A;

pub const REG_TA: u8 = 0x06;
pub const REG_TOBJ1: u8 = 0x07;
pub const REG_TOBJ2: u8 = 0x08;

pub struct Mlx90614<I2C> {
    bus: I2C,
    address: u8,
}

impl<I2C: I2c> Mlx90614<I2C> {
    pub fn new(bus: I2C) -> Self {
        Self::with_address(bus, DEFAULT_ADDRESS)
    }

    pub fn with_address(bus: I2C, address: u8) -> Self {
        Self { bus, address }
    }

    /// Give the bus back (used by tests to inspect a mock).
    pub fn release(self) -> I2C {
        self.bus
    }

    fn read_word(&mut self, register: u8) -> Result<u16, SensorFault> {
        let mut buf = [0u8; 2];
        self.bus
            .write_read(self.address, &[register], &mut buf)
            .map_err(|e| {
                warn!(
                    "MLX90614: read of register 0x{:02x} at 0x{:02x} failed ({:?})",
                    register,
                    self.address,
                    e.kind()
                );
                SensorFault
            })?;
        Ok(u16::from_le_bytes(buf))
    }
}

impl<I2C: I2c> TemperaturePort for Mlx90614<I2C> {
    fn read(&mut self) -> Result<TemperatureReading, SensorFault> {
        let ambient = self.read_word(REG_TA)?;
        let object1 = self.read_word(REG_TOBJ1)?;
        let object2 = self.read_word(REG_TOBJ2)?;
        Ok(TemperatureReading::from_raw(ambient, object1, object2))
    }
}
