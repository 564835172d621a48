//! # SHT30 Driver
//!
//! Exterior temperature and humidity over I2C.
//!
//! One-shot high repeatability measurements without clock stretching: the
//! command goes out as two bytes, the chip needs its conversion time, then
//! six bytes come back as two raw words with interleaved checksums.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use embedded_hal::blocking::i2c;

use crate::error::Result;
use crate::sensors::sensor_err;

/// Single shot, high repeatability, no clock stretching
const CMD_MEASURE: [u8; 2] = [0x24, 0x00];

/// Soft reset command
const CMD_RESET: [u8; 2] = [0x30, 0xA2];

/// Conversion time for a high repeatability measurement
const MEASURE_DELAY: Duration = Duration::from_millis(50);

/// Settle time after soft reset
const RESET_DELAY: Duration = Duration::from_millis(10);

/// SHT30 temperature and humidity sensor
pub struct Sht30<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Sht30<I2C>
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
            .write(self.address, &CMD_RESET)
            .map_err(|e| sensor_err("SHT30 reset", e))?;
        thread::sleep(RESET_DELAY);
        Ok(())
    }

    /// One measurement: temperature in degrees Celsius and relative
    /// humidity in percent
    pub fn read(&mut self) -> Result<(f32, f32)> {
        self.i2c
            .write(self.address, &CMD_MEASURE)
            .map_err(|e| sensor_err("SHT30 measure command", e))?;
        thread::sleep(MEASURE_DELAY);

        let mut raw = [0u8; 6];
        self.i2c
            .read(self.address, &mut raw)
            .map_err(|e| sensor_err("SHT30 readout", e))?;

        let raw_temp = u16::from_be_bytes([raw[0], raw[1]]);
        let raw_humidity = u16::from_be_bytes([raw[3], raw[4]]);

        let temperature = -45.0 + 175.0 * f32::from(raw_temp) / 65535.0;
        let humidity = 100.0 * f32::from(raw_humidity) / 65535.0;
        Ok((temperature, humidity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mocks::{I2cOp, MockI2c};

    #[test]
    fn test_measurement_protocol_and_scaling() {
        let i2c = MockI2c::new();
        // 26214/65535 = 0.4 exactly, so temperature lands on 25.0
        i2c.queue_reply(&[0x66, 0x66, 0x00, 0x80, 0x00, 0x00]);

        let mut sensor = Sht30::new(i2c.clone(), 0x44);
        let (temperature, humidity) = sensor.read().unwrap();

        assert!((temperature - 25.0).abs() < 1e-3);
        assert!((humidity - 50.0).abs() < 0.01);

        let ops = i2c.get_ops();
        assert_eq!(
            ops[0],
            I2cOp::Write {
                addr: 0x44,
                bytes: vec![0x24, 0x00]
            }
        );
        assert_eq!(ops[1], I2cOp::Read { addr: 0x44, len: 6 });
    }

    #[test]
    fn test_reset_command() {
        let i2c = MockI2c::new();
        let mut sensor = Sht30::new(i2c.clone(), 0x44);

        sensor.reset().unwrap();

        assert_eq!(
            i2c.get_ops(),
            vec![I2cOp::Write {
                addr: 0x44,
                bytes: vec![0x30, 0xA2]
            }]
        );
    }

    #[test]
    fn test_bus_error_becomes_sensor_fault() {
        let i2c = MockI2c::new();
        i2c.set_error(std::io::ErrorKind::TimedOut);

        let mut sensor = Sht30::new(i2c, 0x44);
        let result = sensor.read();

        assert!(matches!(
            result,
            Err(crate::error::WeatherLinkError::Sensor(_))
        ));
    }
}
