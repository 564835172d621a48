//! # BMP280 Driver
//!
//! Barometric pressure and enclosure temperature.
//!
//! The chip ships per-device calibration words that feed Bosch's
//! compensation formulas; both readings come out of one six-byte burst so
//! the pressure is always compensated against the temperature sampled in
//! the same conversion.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use embedded_hal::blocking::i2c;

use crate::error::{Result, WeatherLinkError};
use crate::sensors::sensor_err;

const REG_CALIBRATION: u8 = 0x88;
const REG_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_MEASUREMENT: u8 = 0xF7;

/// Chip identity the ID register must report
const CHIP_ID: u8 = 0x58;

/// Magic value that triggers a soft reset
const RESET_COMMAND: u8 = 0xB6;

/// Temperature x2, pressure x16 oversampling, normal mode
const CTRL_MEAS_VALUE: u8 = 0x57;

/// Settle time after soft reset
const RESET_DELAY: Duration = Duration::from_millis(10);

/// Factory calibration words, read once at init
#[derive(Debug, Clone, Copy, Default)]
struct Calibration {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
    dig_p1: u16,
    dig_p2: i16,
    dig_p3: i16,
    dig_p4: i16,
    dig_p5: i16,
    dig_p6: i16,
    dig_p7: i16,
    dig_p8: i16,
    dig_p9: i16,
}

impl Calibration {
    /// Parse the 24-byte calibration block, little-endian words
    fn from_bytes(raw: &[u8; 24]) -> Self {
        let word = |i: usize| u16::from_le_bytes([raw[2 * i], raw[2 * i + 1]]);
        Self {
            dig_t1: word(0),
            dig_t2: word(1) as i16,
            dig_t3: word(2) as i16,
            dig_p1: word(3),
            dig_p2: word(4) as i16,
            dig_p3: word(5) as i16,
            dig_p4: word(6) as i16,
            dig_p5: word(7) as i16,
            dig_p6: word(8) as i16,
            dig_p7: word(9) as i16,
            dig_p8: word(10) as i16,
            dig_p9: word(11) as i16,
        }
    }

    /// Bosch floating point compensation
    ///
    /// Returns temperature in degrees Celsius and pressure in pascal. The
    /// shared `t_fine` term couples the two formulas, so they must run on
    /// raw values from the same burst.
    fn compensate(&self, adc_temp: i32, adc_pressure: i32) -> (f32, f32) {
        let adc_t = adc_temp as f64;
        let adc_p = adc_pressure as f64;

        let var1 = (adc_t / 16384.0 - f64::from(self.dig_t1) / 1024.0) * f64::from(self.dig_t2);
        let var2 = (adc_t / 131072.0 - f64::from(self.dig_t1) / 8192.0)
            * (adc_t / 131072.0 - f64::from(self.dig_t1) / 8192.0)
            * f64::from(self.dig_t3);
        let t_fine = var1 + var2;
        let temperature = t_fine / 5120.0;

        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * f64::from(self.dig_p6) / 32768.0;
        var2 += var1 * f64::from(self.dig_p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.dig_p4) * 65536.0;
        var1 = (f64::from(self.dig_p3) * var1 * var1 / 524288.0
            + f64::from(self.dig_p2) * var1)
            / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * f64::from(self.dig_p1);

        if var1 == 0.0 {
            return (temperature as f32, 0.0);
        }

        let mut pressure = 1048576.0 - adc_p;
        pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
        let var1 = f64::from(self.dig_p9) * pressure * pressure / 2147483648.0;
        let var2 = pressure * f64::from(self.dig_p8) / 32768.0;
        pressure += (var1 + var2 + f64::from(self.dig_p7)) / 16.0;

        (temperature as f32, pressure as f32)
    }
}

/// BMP280 pressure and temperature sensor
pub struct Bmp280<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Calibration,
}

impl<I2C, E> Bmp280<I2C>
where
    I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>,
    E: Debug,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            calibration: Calibration::default(),
        }
    }

    /// Probe, reset and configure the chip, then load its calibration
    ///
    /// # Errors
    ///
    /// Returns `Sensor` if the ID register does not answer with the
    /// BMP280 identity or any bus transaction fails.
    pub fn init(&mut self) -> Result<()> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_ID], &mut id)
            .map_err(|e| sensor_err("BMP280 identity read", e))?;
        if id[0] != CHIP_ID {
            return Err(WeatherLinkError::Sensor(format!(
                "BMP280 at 0x{:02X} answered identity 0x{:02X}, expected 0x{:02X}",
                self.address, id[0], CHIP_ID
            )));
        }

        self.i2c
            .write(self.address, &[REG_RESET, RESET_COMMAND])
            .map_err(|e| sensor_err("BMP280 reset", e))?;
        thread::sleep(RESET_DELAY);

        let mut raw = [0u8; 24];
        self.i2c
            .write_read(self.address, &[REG_CALIBRATION], &mut raw)
            .map_err(|e| sensor_err("BMP280 calibration read", e))?;
        self.calibration = Calibration::from_bytes(&raw);

        self.i2c
            .write(self.address, &[REG_CTRL_MEAS, CTRL_MEAS_VALUE])
            .map_err(|e| sensor_err("BMP280 measurement configuration", e))?;
        Ok(())
    }

    /// One compensated measurement: temperature in degrees Celsius and
    /// pressure in pascal
    pub fn read(&mut self) -> Result<(f32, f32)> {
        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_MEASUREMENT], &mut raw)
            .map_err(|e| sensor_err("BMP280 measurement read", e))?;

        let adc_pressure =
            (i32::from(raw[0]) << 12) | (i32::from(raw[1]) << 4) | (i32::from(raw[2]) >> 4);
        let adc_temp =
            (i32::from(raw[3]) << 12) | (i32::from(raw[4]) << 4) | (i32::from(raw[5]) >> 4);

        Ok(self.calibration.compensate(adc_temp, adc_pressure))
    }
}
