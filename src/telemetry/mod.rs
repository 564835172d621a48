//! # Telemetry Module
//!
//! The measurement record carried over the radio and its JSONL logging.
//!
//! This module handles:
//! - The fixed-layout record the sensor head transmits
//! - Packing and unpacking that record as little-endian floats
//! - Writing received records to rotating JSONL files (`logger`)
//!
//! The wire layout is ten `f32` values in declaration order, 40 bytes
//! total, which leaves comfortable headroom inside a single radio frame.

pub mod logger;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WeatherLinkError};

/// Size of a packed record on the wire
pub const RECORD_SIZE: usize = 40;

/// One full measurement sweep from the sensor head
///
/// Field order is the wire order; changing it changes the protocol.
///
/// # Examples
///
/// ```
/// use weather_link::telemetry::TelemetryRecord;
///
/// let record = TelemetryRecord {
///     temperature: 21.5,
///     ..Default::default()
/// };
/// let bytes = record.to_bytes();
/// let back = TelemetryRecord::from_bytes(&bytes)?;
/// assert_eq!(back.temperature, 21.5);
/// # Ok::<(), weather_link::error::WeatherLinkError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Enclosure temperature in degrees Celsius
    pub temperature: f32,
    /// Barometric pressure in pascal
    pub pressure: f32,
    /// Outside air temperature in degrees Celsius
    pub exterior_temperature: f32,
    /// Outside relative humidity in percent
    pub exterior_humidity: f32,
    /// Battery bus voltage in volts
    pub battery_voltage: f32,
    /// Battery current in amps, positive when discharging
    pub battery_current: f32,
    /// Battery power in watts
    pub battery_power: f32,
    /// Solar panel bus voltage in volts
    pub solar_voltage: f32,
    /// Solar panel current in amps
    pub solar_current: f32,
    /// Solar panel power in watts
    pub solar_power: f32,
}

impl TelemetryRecord {
    /// Pack the record into its wire form
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let mut cursor = &mut buf[..];
        cursor.put_f32_le(self.temperature);
        cursor.put_f32_le(self.pressure);
        cursor.put_f32_le(self.exterior_temperature);
        cursor.put_f32_le(self.exterior_humidity);
        cursor.put_f32_le(self.battery_voltage);
        cursor.put_f32_le(self.battery_current);
        cursor.put_f32_le(self.battery_power);
        cursor.put_f32_le(self.solar_voltage);
        cursor.put_f32_le(self.solar_current);
        cursor.put_f32_le(self.solar_power);
        buf
    }

    /// Unpack a record from its wire form
    ///
    /// # Errors
    ///
    /// Returns `BusFault` if the input is not exactly [`RECORD_SIZE`]
    /// bytes; a mangled payload must not decode into plausible readings.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(WeatherLinkError::BusFault(format!(
                "telemetry record needs {} bytes, got {}",
                RECORD_SIZE,
                bytes.len()
            )));
        }

        Ok(Self {
            temperature: bytes.get_f32_le(),
            pressure: bytes.get_f32_le(),
            exterior_temperature: bytes.get_f32_le(),
            exterior_humidity: bytes.get_f32_le(),
            battery_voltage: bytes.get_f32_le(),
            battery_current: bytes.get_f32_le(),
            battery_power: bytes.get_f32_le(),
            solar_voltage: bytes.get_f32_le(),
            solar_current: bytes.get_f32_le(),
            solar_power: bytes.get_f32_le(),
        })
    }
}
