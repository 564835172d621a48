//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every knob the link and the sensors need lives here: node identity,
//! bus device paths, radio timeouts, RF tuning registers and telemetry
//! logging limits. All fields carry defaults matching the reference
//! station wiring, so a minimal file only has to name its sections.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub radio: RadioConfig,
    pub sensors: SensorConfig,
    pub telemetry: TelemetryConfig,
}

/// Node identity and cadence
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    /// Which half of the link this process runs: "sensor" or "base"
    #[serde(default = "default_role")]
    pub role: String,

    /// This node's radio address; received frames for other addresses are
    /// rejected
    #[serde(default = "default_address")]
    pub address: u8,

    /// Address frames are sent to
    #[serde(default = "default_address")]
    pub peer_address: u8,

    /// How often the sensor node samples and transmits
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

/// Radio bus wiring and link timing
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_spi_device")]
    pub spi_device: String,

    #[serde(default = "default_spi_speed_hz")]
    pub spi_speed_hz: u32,

    #[serde(default = "default_gpio_device")]
    pub gpio_device: String,

    /// GPIO line offset driving the radio's chip select
    #[serde(default = "default_cs_line")]
    pub cs_line: u32,

    /// GPIO line offset wired to the radio's GDO0 pin
    #[serde(default = "default_gdo0_line")]
    pub gdo0_line: u32,

    /// RF channel number written to the radio
    #[serde(default = "default_channel")]
    pub channel: u8,

    /// Upper bound on one transmit, sync word to end of packet
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,

    /// Upper bound on one receive window
    #[serde(default = "default_rx_timeout_ms")]
    pub rx_timeout_ms: u64,

    #[serde(default)]
    pub tuning: TuningConfig,
}

/// Raw register values programmed into the radio at configure time
///
/// The defaults select 433.92 MHz, 38.4 kBaud GFSK with CRC, variable
/// packet length and appended status bytes. Override individual registers
/// to retune without rebuilding.
#[derive(Debug, Deserialize, Clone)]
pub struct TuningConfig {
    #[serde(default = "default_sync1")]
    pub sync1: u8,

    #[serde(default = "default_sync0")]
    pub sync0: u8,

    #[serde(default = "default_pktctrl1")]
    pub pktctrl1: u8,

    #[serde(default = "default_pktctrl0")]
    pub pktctrl0: u8,

    #[serde(default = "default_freq2")]
    pub freq2: u8,

    #[serde(default = "default_freq1")]
    pub freq1: u8,

    #[serde(default = "default_freq0")]
    pub freq0: u8,

    #[serde(default = "default_mdmcfg4")]
    pub mdmcfg4: u8,

    #[serde(default = "default_mdmcfg3")]
    pub mdmcfg3: u8,

    #[serde(default = "default_mdmcfg2")]
    pub mdmcfg2: u8,
}

/// Sensor bus addresses and calibration inputs
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_i2c_device")]
    pub i2c_device: String,

    /// Exterior temperature/humidity chip: "sht30" or "sht40"
    #[serde(default = "default_exterior")]
    pub exterior: String,

    #[serde(default = "default_bmp280_address")]
    pub bmp280_address: u8,

    #[serde(default = "default_exterior_address")]
    pub exterior_address: u8,

    #[serde(default = "default_battery_monitor_address")]
    pub battery_monitor_address: u8,

    #[serde(default = "default_solar_monitor_address")]
    pub solar_monitor_address: u8,

    /// Shunt resistor value on both power monitors, in ohms
    #[serde(default = "default_shunt_ohms")]
    pub shunt_ohms: f32,

    /// Full-scale current the monitors are calibrated for, in amps
    #[serde(default = "default_max_expected_amps")]
    pub max_expected_amps: f32,
}

/// Telemetry logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_role() -> String { "sensor".to_string() }
fn default_address() -> u8 { 0x66 }
fn default_sample_interval_ms() -> u64 { 1000 }

fn default_spi_device() -> String { "/dev/spidev0.0".to_string() }
fn default_spi_speed_hz() -> u32 { 500_000 }
fn default_gpio_device() -> String { "/dev/gpiochip0".to_string() }
fn default_cs_line() -> u32 { 8 }
fn default_gdo0_line() -> u32 { 25 }
fn default_channel() -> u8 { 0 }
fn default_tx_timeout_ms() -> u64 { 100 }
fn default_rx_timeout_ms() -> u64 { 1000 }

fn default_sync1() -> u8 { 0xD3 }
fn default_sync0() -> u8 { 0x91 }
fn default_pktctrl1() -> u8 { 0x04 }
fn default_pktctrl0() -> u8 { 0x05 }
fn default_freq2() -> u8 { 0x21 }
fn default_freq1() -> u8 { 0x65 }
fn default_freq0() -> u8 { 0x6A }
fn default_mdmcfg4() -> u8 { 0x8C }
fn default_mdmcfg3() -> u8 { 0x22 }
fn default_mdmcfg2() -> u8 { 0x02 }

fn default_i2c_device() -> String { "/dev/i2c-1".to_string() }
fn default_exterior() -> String { "sht30".to_string() }
fn default_bmp280_address() -> u8 { 0x76 }
fn default_exterior_address() -> u8 { 0x44 }
fn default_battery_monitor_address() -> u8 { 0x41 }
fn default_solar_monitor_address() -> u8 { 0x40 }
fn default_shunt_ohms() -> f32 { 0.1 }
fn default_max_expected_amps() -> f32 { 3.2 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            address: default_address(),
            peer_address: default_address(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            spi_device: default_spi_device(),
            spi_speed_hz: default_spi_speed_hz(),
            gpio_device: default_gpio_device(),
            cs_line: default_cs_line(),
            gdo0_line: default_gdo0_line(),
            channel: default_channel(),
            tx_timeout_ms: default_tx_timeout_ms(),
            rx_timeout_ms: default_rx_timeout_ms(),
            tuning: TuningConfig::default(),
        }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            sync1: default_sync1(),
            sync0: default_sync0(),
            pktctrl1: default_pktctrl1(),
            pktctrl0: default_pktctrl0(),
            freq2: default_freq2(),
            freq1: default_freq1(),
            freq0: default_freq0(),
            mdmcfg4: default_mdmcfg4(),
            mdmcfg3: default_mdmcfg3(),
            mdmcfg2: default_mdmcfg2(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_device: default_i2c_device(),
            exterior: default_exterior(),
            bmp280_address: default_bmp280_address(),
            exterior_address: default_exterior_address(),
            battery_monitor_address: default_battery_monitor_address(),
            solar_monitor_address: default_solar_monitor_address(),
            shunt_ohms: default_shunt_ohms(),
            max_expected_amps: default_max_expected_amps(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            radio: RadioConfig::default(),
            sensors: SensorConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Sampling period as a `Duration`
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl RadioConfig {
    /// Transmit deadline as a `Duration`
    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout_ms)
    }

    /// Receive window as a `Duration`
    pub fn rx_timeout(&self) -> Duration {
        Duration::from_millis(self.rx_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use weather_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate node identity
        if self.node.role != "sensor" && self.node.role != "base" {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("role must be 'sensor' or 'base'")
            ));
        }

        if self.node.sample_interval_ms == 0 || self.node.sample_interval_ms > 3_600_000 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("sample_interval_ms must be between 1 and 3600000")
            ));
        }

        // Validate radio bus configuration
        if self.radio.spi_device.is_empty() {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("spi_device cannot be empty")
            ));
        }

        if self.radio.gpio_device.is_empty() {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("gpio_device cannot be empty")
            ));
        }

        // CC1101 tops out at 6.5 MHz SPI
        if self.radio.spi_speed_hz < 100_000 || self.radio.spi_speed_hz > 6_500_000 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("spi_speed_hz must be between 100000 and 6500000")
            ));
        }

        // Validate link timing
        if self.radio.tx_timeout_ms == 0 || self.radio.tx_timeout_ms > 10000 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("tx_timeout_ms must be between 1 and 10000")
            ));
        }

        if self.radio.rx_timeout_ms == 0 || self.radio.rx_timeout_ms > 60000 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("rx_timeout_ms must be between 1 and 60000")
            ));
        }

        // Validate sensor configuration
        if self.sensors.i2c_device.is_empty() {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("i2c_device cannot be empty")
            ));
        }

        if self.sensors.exterior != "sht30" && self.sensors.exterior != "sht40" {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("exterior sensor must be 'sht30' or 'sht40'")
            ));
        }

        if self.sensors.shunt_ohms <= 0.0 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("shunt_ohms must be greater than 0")
            ));
        }

        if self.sensors.max_expected_amps <= 0.0 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("max_expected_amps must be greater than 0")
            ));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("telemetry log_dir cannot be empty when enabled")
            ));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0")
            ));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0")
            ));
        }

        if self.telemetry.format != "jsonl" {
            return Err(crate::error::WeatherLinkError::Config(
                toml::de::Error::custom("log format must be 'jsonl' (only supported format)")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_addresses_and_tuning() {
        let config = Config::default();
        assert_eq!(config.node.address, 0x66);
        assert_eq!(config.node.peer_address, 0x66);
        assert_eq!(config.radio.tuning.freq2, 0x21);
        assert_eq!(config.radio.tuning.mdmcfg4, 0x8C);
        assert_eq!(config.radio.tuning.pktctrl1, 0x04);
    }

    #[test]
    fn test_invalid_role() {
        let mut config = Config::default();
        config.node.role = "relay".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_sample_interval() {
        let mut config = Config::default();
        config.node.sample_interval_ms = 0;
        assert!(config.validate().is_err());

        config.node.sample_interval_ms = 4_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_spi_speed() {
        let mut config = Config::default();
        config.radio.spi_speed_hz = 50_000;
        assert!(config.validate().is_err());

        config.radio.spi_speed_hz = 7_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_timeouts() {
        let mut config = Config::default();
        config.radio.tx_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.radio.tx_timeout_ms = 100;
        config.radio.rx_timeout_ms = 70_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_exterior_sensor() {
        let mut config = Config::default();
        config.sensors.exterior = "dht22".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shunt_must_be_positive() {
        let mut config = Config::default();
        config.sensors.shunt_ohms = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_dir_required_when_enabled() {
        let mut config = Config::default();
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());

        config.telemetry.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_format_must_be_jsonl() {
        let mut config = Config::default();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_helpers() {
        let config = Config::default();
        assert_eq!(config.radio.tx_timeout(), Duration::from_millis(100));
        assert_eq!(config.radio.rx_timeout(), Duration::from_millis(1000));
        assert_eq!(config.node.sample_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[node]
role = "base"
address = 0x50

[radio]
channel = 2

[sensors]

[telemetry]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.node.role, "base");
        assert_eq!(config.node.address, 0x50);
        assert_eq!(config.radio.channel, 2);
        // Unnamed fields fall back to defaults
        assert_eq!(config.radio.spi_device, "/dev/spidev0.0");
        assert_eq!(config.radio.tuning.sync1, 0xD3);
        assert_eq!(config.sensors.exterior, "sht30");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[node]
role = "gateway"

[radio]

[sensors]

[telemetry]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }
}
