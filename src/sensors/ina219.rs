//! # INA219 Driver
//!
//! High-side power monitor used on both the battery and the solar input.
//!
//! The chip only reports meaningful current and power after its
//! calibration register is programmed for the shunt value in use, so
//! [`Ina219::calibrate`] must run once before the first reading. All
//! registers are 16 bits, big endian on the wire.

use std::fmt::Debug;

use embedded_hal::blocking::i2c;

use crate::error::Result;
use crate::sensors::sensor_err;

const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

/// Datasheet scaling constant for the calibration register
const CALIBRATION_FACTOR: f32 = 0.04096;

/// Bus voltage register LSB, after the 3-bit right shift
const BUS_LSB_VOLTS: f32 = 0.004;

/// Shunt voltage register LSB
const SHUNT_LSB_MILLIVOLTS: f32 = 0.01;

/// Power register LSB is twenty times the current LSB
const POWER_LSB_FACTOR: f32 = 20.0;

/// One complete reading from a power monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    /// Bus voltage in volts
    pub bus_voltage: f32,
    /// Current through the shunt in amps
    pub current: f32,
    /// Power in watts
    pub power: f32,
}

/// INA219 power monitor
pub struct Ina219<I2C> {
    i2c: I2C,
    address: u8,
    current_lsb: f32,
    calibration: u16,
}

impl<I2C, E> Ina219<I2C>
where
    I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>,
    E: Debug,
{
    /// Create a monitor scaled for a shunt value and full-scale current
    ///
    /// The current LSB is full scale over 2^15 and the calibration value
    /// follows from it, per the datasheet programming procedure.
    pub fn new(i2c: I2C, address: u8, shunt_ohms: f32, max_expected_amps: f32) -> Self {
        let current_lsb = max_expected_amps / 32768.0;
        let calibration = (CALIBRATION_FACTOR / (current_lsb * shunt_ohms)) as u16;
        Self {
            i2c,
            address,
            current_lsb,
            calibration,
        }
    }

    /// Program the calibration register
    ///
    /// Without this the current and power registers read zero regardless
    /// of the actual load.
    pub fn calibrate(&mut self) -> Result<()> {
        self.write_register(REG_CALIBRATION, self.calibration)
    }

    /// Bus voltage in volts
    pub fn bus_voltage(&mut self) -> Result<f32> {
        let raw = self.read_register(REG_BUS_VOLTAGE)?;
        Ok(f32::from(raw >> 3) * BUS_LSB_VOLTS)
    }

    /// Voltage across the shunt in millivolts, signed
    pub fn shunt_voltage_mv(&mut self) -> Result<f32> {
        let raw = self.read_register(REG_SHUNT_VOLTAGE)? as i16;
        Ok(f32::from(raw) * SHUNT_LSB_MILLIVOLTS)
    }

    /// Current through the shunt in amps, signed
    pub fn current(&mut self) -> Result<f32> {
        let raw = self.read_register(REG_CURRENT)? as i16;
        Ok(f32::from(raw) * self.current_lsb)
    }

    /// Power in watts
    pub fn power(&mut self) -> Result<f32> {
        let raw = self.read_register(REG_POWER)?;
        Ok(f32::from(raw) * POWER_LSB_FACTOR * self.current_lsb)
    }

    /// Bus voltage, current and power in one sweep
    pub fn read(&mut self) -> Result<PowerReading> {
        Ok(PowerReading {
            bus_voltage: self.bus_voltage()?,
            current: self.current()?,
            power: self.power()?,
        })
    }

    fn write_register(&mut self, reg: u8, value: u16) -> Result<()> {
        let bytes = value.to_be_bytes();
        self.i2c
            .write(self.address, &[reg, bytes[0], bytes[1]])
            .map_err(|e| sensor_err("INA219 register write", e))
    }

    fn read_register(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|e| sensor_err("INA219 register read", e))?;
        Ok(u16::from_be_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mocks::{I2cOp, MockI2c};

    fn make_monitor(i2c: MockI2c) -> Ina219<MockI2c> {
        // 0.1 ohm shunt, 3.2 A full scale: current LSB just under 0.1 mA
        Ina219::new(i2c, 0x41, 0.1, 3.2)
    }

    #[test]
    fn test_calibration_register_value() {
        let i2c = MockI2c::new();
        let mut monitor = make_monitor(i2c.clone());

        monitor.calibrate().unwrap();

        // 0.04096 / (9.765625e-5 * 0.1) = 4194
        assert_eq!(
            i2c.get_ops(),
            vec![I2cOp::Write {
                addr: 0x41,
                bytes: vec![0x05, 0x10, 0x62]
            }]
        );
    }

    #[test]
    fn test_bus_voltage_shifts_and_scales() {
        let i2c = MockI2c::new();
        i2c.queue_reply(&[0x5D, 0xC0]); // 24000 raw, 3000 after shift

        let mut monitor = make_monitor(i2c);
        let volts = monitor.bus_voltage().unwrap();

        assert!((volts - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_current_uses_calibrated_lsb() {
        let i2c = MockI2c::new();
        i2c.queue_reply(&[0x04, 0x00]); // 1024 counts

        let mut monitor = make_monitor(i2c);
        let amps = monitor.current().unwrap();

        assert!((amps - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_power_lsb_is_twenty_times_current_lsb() {
        let i2c = MockI2c::new();
        i2c.queue_reply(&[0x02, 0x00]); // 512 counts

        let mut monitor = make_monitor(i2c);
        let watts = monitor.power().unwrap();

        assert!((watts - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shunt_voltage_is_signed() {
        let i2c = MockI2c::new();
        i2c.queue_reply(&[0xFF, 0x9C]); // -100 counts

        let mut monitor = make_monitor(i2c);
        let millivolts = monitor.shunt_voltage_mv().unwrap();

        assert!((millivolts + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_combined_reading_order() {
        let i2c = MockI2c::new();
        i2c.queue_reply(&[0x5D, 0xC0]);
        i2c.queue_reply(&[0x04, 0x00]);
        i2c.queue_reply(&[0x02, 0x00]);

        let mut monitor = make_monitor(i2c.clone());
        let reading = monitor.read().unwrap();

        assert!((reading.bus_voltage - 12.0).abs() < 1e-5);
        assert!((reading.current - 0.1).abs() < 1e-6);
        assert!((reading.power - 1.0).abs() < 1e-6);

        let regs: Vec<u8> = i2c
            .get_ops()
            .iter()
            .map(|op| match op {
                I2cOp::WriteRead { bytes, .. } => bytes[0],
                other => panic!("Unexpected op {:?}", other),
            })
            .collect();
        assert_eq!(regs, vec![0x02, 0x04, 0x03]);
    }
}
