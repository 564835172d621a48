//! # Sensors Module
//!
//! I2C sensor drivers and the combined sensor head.
//!
//! This module handles:
//! - Barometric pressure and enclosure temperature (`bmp280`)
//! - Exterior temperature and humidity (`sht30`, `sht40`)
//! - Battery and solar power monitoring (`ina219`)
//! - Assembling one telemetry record from all of them (`SensorHead`)
//!
//! Every driver is generic over the `embedded-hal` blocking I2C traits and
//! owns its own bus handle; the kernel serializes transactions on the
//! shared wire.

use std::fmt::Debug;

use embedded_hal::blocking::i2c;
use linux_embedded_hal::I2cdev;
use tracing::info;

use crate::bus::open_i2c;
use crate::config::SensorConfig;
use crate::error::{Result, WeatherLinkError};
use crate::telemetry::TelemetryRecord;

pub mod bmp280;
pub mod ina219;
pub mod sht30;
pub mod sht40;

pub use bmp280::Bmp280;
pub use ina219::{Ina219, PowerReading};
pub use sht30::Sht30;
pub use sht40::Sht40;

/// Wrap a bus-level failure into a `Sensor` error with context
pub(crate) fn sensor_err(context: &str, err: impl Debug) -> WeatherLinkError {
    WeatherLinkError::Sensor(format!("{}: {:?}", context, err))
}

/// Whichever exterior probe the station was built with
///
/// The two chips answer at the same address with the same readout layout
/// but different command sets, so the choice comes from configuration
/// rather than probing.
pub enum ExteriorSensor<I2C> {
    Sht30(Sht30<I2C>),
    Sht40(Sht40<I2C>),
}

impl<I2C, E> ExteriorSensor<I2C>
where
    I2C: i2c::Write<Error = E> + i2c::Read<Error = E>,
    E: Debug,
{
    pub fn reset(&mut self) -> Result<()> {
        match self {
            Self::Sht30(sensor) => sensor.reset(),
            Self::Sht40(sensor) => sensor.reset(),
        }
    }

    /// Temperature in degrees Celsius and relative humidity in percent
    pub fn read(&mut self) -> Result<(f32, f32)> {
        match self {
            Self::Sht30(sensor) => sensor.read(),
            Self::Sht40(sensor) => sensor.read(),
        }
    }
}

/// All sensors on the station, sampled together into one record
pub struct SensorHead<I2C> {
    barometer: Bmp280<I2C>,
    exterior: ExteriorSensor<I2C>,
    battery: Ina219<I2C>,
    solar: Ina219<I2C>,
}

impl<I2C, E> SensorHead<I2C>
where
    I2C: i2c::Write<Error = E> + i2c::Read<Error = E> + i2c::WriteRead<Error = E>,
    E: Debug,
{
    pub fn new(
        barometer: Bmp280<I2C>,
        exterior: ExteriorSensor<I2C>,
        battery: Ina219<I2C>,
        solar: Ina219<I2C>,
    ) -> Self {
        Self {
            barometer,
            exterior,
            battery,
            solar,
        }
    }

    /// Bring every sensor into a known state
    ///
    /// # Errors
    ///
    /// Returns the first `Sensor` error encountered; a station with a dead
    /// sensor should fail loudly at startup rather than transmit garbage.
    pub fn init(&mut self) -> Result<()> {
        self.barometer.init()?;
        self.exterior.reset()?;
        self.battery.calibrate()?;
        self.solar.calibrate()?;
        info!("Sensor head initialized");
        Ok(())
    }

    /// Sample every sensor and assemble a telemetry record
    pub fn sample(&mut self) -> Result<TelemetryRecord> {
        let (temperature, pressure) = self.barometer.read()?;
        let (exterior_temperature, exterior_humidity) = self.exterior.read()?;
        let battery = self.battery.read()?;
        let solar = self.solar.read()?;

        Ok(TelemetryRecord {
            temperature,
            pressure,
            exterior_temperature,
            exterior_humidity,
            battery_voltage: battery.bus_voltage,
            battery_current: battery.current,
            battery_power: battery.power,
            solar_voltage: solar.bus_voltage,
            solar_current: solar.current,
            solar_power: solar.power,
        })
    }
}

impl SensorHead<I2cdev> {
    /// Open every sensor named in the configuration on the Linux I2C bus
    ///
    /// # Errors
    ///
    /// Returns `Sensor` if the device node cannot be opened or the
    /// configured exterior chip name is unknown.
    pub fn open(config: &SensorConfig) -> Result<Self> {
        let barometer = Bmp280::new(open_i2c(&config.i2c_device)?, config.bmp280_address);

        let exterior = match config.exterior.as_str() {
            "sht30" => ExteriorSensor::Sht30(Sht30::new(
                open_i2c(&config.i2c_device)?,
                config.exterior_address,
            )),
            "sht40" => ExteriorSensor::Sht40(Sht40::new(
                open_i2c(&config.i2c_device)?,
                config.exterior_address,
            )),
            other => {
                return Err(WeatherLinkError::Sensor(format!(
                    "unknown exterior sensor '{}'",
                    other
                )))
            }
        };

        let battery = Ina219::new(
            open_i2c(&config.i2c_device)?,
            config.battery_monitor_address,
            config.shunt_ohms,
            config.max_expected_amps,
        );
        let solar = Ina219::new(
            open_i2c(&config.i2c_device)?,
            config.solar_monitor_address,
            config.shunt_ohms,
            config.max_expected_amps,
        );

        Ok(Self::new(barometer, exterior, battery, solar))
    }
}
