//! # SHT40 Driver
//!
//! Drop-in alternative to the SHT30 for the exterior probe, with the
//! newer single-byte command set.
//!
//! The readout format matches the SHT30 but the humidity scale does not:
//! the SHT40 reports -6 % to 119 %, so out-of-range values are clamped
//! to the physical 0 to 100 range the record carries.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use embedded_hal::blocking::i2c;

use crate::error::Result;
use crate::sensors::sensor_err;

/// Measure with high precision
const CMD_MEASURE: u8 = 0xFD;

/// Soft reset command
const CMD_RESET: u8 = 0x94;

/// Conversion time for a high precision measurement
const MEASURE_DELAY: Duration = Duration::from_millis(10);

/// Settle time after soft reset
const RESET_DELAY: Duration = Duration::from_millis(10);

/// SHT40 temperature and humidity sensor
pub struct Sht40<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Sht40<I2C>
where
    I2C: i2c::Write<Error = E> + i2c::Read<Error = E>,
    E: Debug,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Soft reset the chip and wait for it to come back
    pub fn reset(&mut self) -> Result<()> {
        self.i2c
            .write(self.address, &[CMD_RESET])
            .map_err(|e| sensor_err("SHT40 reset", e))?;
        thread::sleep(RESET_DELAY);
        Ok(())
    }

    /// One measurement: temperature in degrees Celsius and relative
    /// humidity in percent, clamped to 0 to 100
    pub fn read(&mut self) -> Result<(f32, f32)> {
        self.i2c
            .write(self.address, &[CMD_MEASURE])
            .map_err(|e| sensor_err("SHT40 measure command", e))?;
        thread::sleep(MEASURE_DELAY);

        let mut raw = [0u8; 6];
        self.i2c
            .read(self.address, &mut raw)
            .map_err(|e| sensor_err("SHT40 readout", e))?;

        let raw_temp = u16::from_be_bytes([raw[0], raw[1]]);
        let raw_humidity = u16::from_be_bytes([raw[3], raw[4]]);

        let temperature = -45.0 + 175.0 * f32::from(raw_temp) / 65535.0;
        let humidity = (-6.0 + 125.0 * f32::from(raw_humidity) / 65535.0).clamp(0.0, 100.0);
        Ok((temperature, humidity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mocks::{I2cOp, MockI2c};

    #[test]
    fn test_measurement_uses_single_byte_commands() {
        let i2c = MockI2c::new();
        i2c.queue_reply(&[0x66, 0x66, 0x00, 0x80, 0x00, 0x00]);

        let mut sensor = Sht40::new(i2c.clone(), 0x44);
        let (temperature, humidity) = sensor.read().unwrap();

        assert!((temperature - 25.0).abs() < 1e-3);
        // -6 + 125 * 0.5 = 56.5
        assert!((humidity - 56.5).abs() < 0.01);

        let ops = i2c.get_ops();
        assert_eq!(
            ops[0],
            I2cOp::Write {
                addr: 0x44,
                bytes: vec![0xFD]
            }
        );
        assert_eq!(ops[1], I2cOp::Read { addr: 0x44, len: 6 });
    }

    #[test]
    fn test_humidity_is_clamped_to_physical_range() {
        let i2c = MockI2c::new();
        i2c.queue_reply(&[0x66, 0x66, 0x00, 0xFF, 0xFF, 0x00]);
        i2c.queue_reply(&[0x66, 0x66, 0x00, 0x00, 0x00, 0x00]);

        let mut sensor = Sht40::new(i2c, 0x44);

        let (_, high) = sensor.read().unwrap();
        assert_eq!(high, 100.0);

        let (_, low) = sensor.read().unwrap();
        assert_eq!(low, 0.0);
    }

    #[test]
    fn test_reset_command() {
        let i2c = MockI2c::new();
        let mut sensor = Sht40::new(i2c.clone(), 0x44);

        sensor.reset().unwrap();

        assert_eq!(
            i2c.get_ops(),
            vec![I2cOp::Write {
                addr: 0x44,
                bytes: vec![0x94]
            }]
        );
    }
}
