//! # Weather Link
//!
//! Telemetry link for a solar-powered weather station over a CC1101 radio.
//!
//! One binary serves both ends of the link: the station in the yard samples
//! its sensors and transmits fixed-layout records, and the base station
//! indoors receives them and appends them to disk as JSON lines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use linux_embedded_hal::{CdevPin, I2cdev, Spidev};
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod bus;
mod config;
mod error;
mod radio;
mod sensors;
mod telemetry;

use bus::RadioBus;
use config::Config;
use error::WeatherLinkError;
use radio::{Cc1101, RadioLink, MAX_PAYLOAD_LEN};
use sensors::SensorHead;
use telemetry::logger::{TelemetryEntry, TelemetryLogger};
use telemetry::TelemetryRecord;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Application log file name; rolled daily next to the telemetry records
const APP_LOG_NAME: &str = "weather-link.log";

/// The link as opened on the device: spidev plus two character-device lines
type StationLink = RadioLink<Spidev, CdevPin, CdevPin>;

/// Main entry point for the Weather Link application
///
/// Loads the configuration, sets up logging and dispatches to whichever
/// role this node is configured for.
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load the TOML configuration (path from the first argument)
///    - Set up the tracing subscriber, with a rolling file log on nodes
///      that keep telemetry on disk
///    - Open the SPI, GPIO and I2C devices and configure the radio
///
/// 2. **Sensor role**
///    - Sample all sensors on the configured interval
///    - Pack each reading into a 40-byte record and transmit it
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Base role**
///    - Receive records in a blocking loop on a worker thread
///    - Append each record to the JSONL telemetry log with its RSSI
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file is missing or invalid
/// - A device node cannot be opened (radio or sensors not wired up)
/// - The bus fails mid-flight; frame-level radio errors are logged and
///   retried instead
///
/// # Examples
///
/// Run the base station with its own configuration:
/// ```bash
/// cargo run --release -- config/base.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO weather_link: Weather Link v0.1.0 starting as 'base' node
/// INFO weather_link::bus: Opened SPI device /dev/spidev0.0 at 500000 Hz
/// INFO weather_link::radio::link: Radio configured on channel 0 as address 0x01
/// INFO weather_link: Record 1: 24.3 C, 100870 Pa, battery 12.61 V, -63 dBm (strong)
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    let _log_guard = init_logging(&config.telemetry)?;

    info!(
        "Weather Link v{} starting as '{}' node",
        env!("CARGO_PKG_VERSION"),
        config.node.role
    );
    debug!("Configuration loaded from {}", config_path);

    match config.node.role.as_str() {
        "sensor" => run_sensor_node(config).await,
        "base" => run_base_station(config).await,
        other => anyhow::bail!("unknown node role '{}'", other),
    }
}

/// Set up the tracing subscriber
///
/// Always logs to stderr. Nodes that keep telemetry on disk also get a
/// daily-rolled application log next to the records, written through a
/// non-blocking worker; the returned guard must stay alive until exit so
/// the worker flushes.
fn init_logging(telemetry: &config::TelemetryConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if telemetry.enabled {
        std::fs::create_dir_all(&telemetry.log_dir)?;
        let appender = tracing_appender::rolling::daily(&telemetry.log_dir, APP_LOG_NAME);
        let (file_writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        Ok(None)
    }
}

/// Open the radio devices and bring the link up configured and idle
fn open_link(config: &Config) -> Result<StationLink, WeatherLinkError> {
    let bus = RadioBus::open(&config.radio)?;
    let driver = Cc1101::new(bus.spi, bus.chip_select, bus.packet_line);
    let mut link = RadioLink::new(driver, config.radio.clone(), config.node.address);
    link.configure()?;
    Ok(link)
}

/// Run the sensor role: sample on a fixed interval and transmit each record
///
/// Sensor glitches and transmit timeouts are logged and the sample dropped;
/// the next interval tick tries again. Bus-level failures end the run.
async fn run_sensor_node(config: Config) -> Result<()> {
    let mut link = open_link(&config)?;
    let mut head = SensorHead::open(&config.sensors)?;
    head.init()?;

    info!(
        "Sampling every {} ms, transmitting to 0x{:02X}",
        config.node.sample_interval_ms, config.node.peer_address
    );

    let mut sample_interval = interval(config.node.sample_interval());
    let mut sent: u64 = 0;
    let mut failed: u64 = 0;

    loop {
        tokio::select! {
            _ = sample_interval.tick() => {
                // Sampling blocks for the sensor conversion times plus at
                // most one transmit timeout, well inside the interval
                match sample_and_send(&mut head, &mut link, config.node.peer_address) {
                    Ok(record) => {
                        sent += 1;
                        info!(
                            "Sent record {}: {:.1} C, {:.0} Pa, battery {:.2} V",
                            sent, record.temperature, record.pressure, record.battery_voltage
                        );
                    }
                    Err(err @ (WeatherLinkError::BusFault(_) | WeatherLinkError::Io(_))) => {
                        return Err(err.into());
                    }
                    Err(err) => {
                        failed += 1;
                        warn!("Sample dropped: {}", err);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    link.idle()?;
    info!("Sent {} records, {} failures", sent, failed);
    Ok(())
}

/// One sample-transmit cycle; the record comes back for the caller's log line
fn sample_and_send(
    head: &mut SensorHead<I2cdev>,
    link: &mut StationLink,
    dest: u8,
) -> Result<TelemetryRecord, WeatherLinkError> {
    let record = head.sample()?;
    link.send(&record.to_bytes(), dest)?;
    Ok(record)
}

/// Run the base role: receive records and append them to the telemetry log
///
/// The receive loop blocks on the radio, so it runs on a worker thread;
/// Ctrl+C raises the stop flag and the loop exits within one receive
/// timeout.
async fn run_base_station(config: Config) -> Result<()> {
    let link = open_link(&config)?;
    let logger = TelemetryLogger::new(&config.telemetry)?;

    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);
    let mut worker = tokio::task::spawn_blocking(move || receive_loop(link, logger, &worker_stop));

    tokio::select! {
        joined = &mut worker => joined??,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            stop.store(true, Ordering::Relaxed);
            worker.await??;
        }
    }
    Ok(())
}

/// Blocking receive loop; runs until the stop flag is raised
///
/// Timeouts and empty receptions just re-arm the next window. Corrupt and
/// misaddressed frames are counted and logged. Bus-level failures end the
/// loop.
fn receive_loop(
    mut link: StationLink,
    mut logger: TelemetryLogger,
    stop: &AtomicBool,
) -> Result<(), WeatherLinkError> {
    let mut buf = [0u8; MAX_PAYLOAD_LEN];
    let mut received: u64 = 0;
    let mut dropped: u64 = 0;

    while !stop.load(Ordering::Relaxed) {
        match link.receive(&mut buf) {
            Ok(packet) => {
                let record = match TelemetryRecord::from_bytes(&buf[..packet.payload_len]) {
                    Ok(record) => record,
                    Err(err) => {
                        dropped += 1;
                        warn!("Undecodable record ({} bytes): {}", packet.payload_len, err);
                        continue;
                    }
                };
                received += 1;
                info!(
                    "Record {}: {:.1} C, {:.0} Pa, battery {:.2} V, {} dBm ({})",
                    received,
                    record.temperature,
                    record.pressure,
                    record.battery_voltage,
                    packet.rssi_dbm,
                    packet.quality
                );
                logger.log(&TelemetryEntry::new(
                    record,
                    packet.rssi_dbm,
                    packet.lqi,
                    packet.quality,
                ))?;
            }
            Err(WeatherLinkError::RxTimeout(_)) | Err(WeatherLinkError::NoData) => {}
            Err(err @ WeatherLinkError::CrcError)
            | Err(err @ WeatherLinkError::RxFifoOverflow)
            | Err(err @ WeatherLinkError::AddressMismatch { .. }) => {
                dropped += 1;
                warn!("Dropped frame: {}", err);
            }
            Err(err) => return Err(err),
        }
    }

    link.idle()?;
    info!("Received {} records, dropped {}", received, dropped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_record_fits_one_frame() {
        // A whole record must travel in a single radio frame
        assert!(telemetry::RECORD_SIZE <= MAX_PAYLOAD_LEN);
    }
}
