//! # Error Types
//!
//! Custom error types for Weather Link using `thiserror`.
//!
//! The radio variants mirror the link-layer failure modes. All of them
//! leave the chip in a known state, so the caller is free to retry; the
//! receive path in particular returns to its listening posture first.

use std::time::Duration;

use thiserror::Error;

/// Main error type for Weather Link
#[derive(Debug, Error)]
pub enum WeatherLinkError {
    /// SPI or GPIO transfer failed or returned short
    #[error("bus fault: {0}")]
    BusFault(String),

    /// Payload rejected before any bus activity
    #[error("payload of {size} bytes exceeds the {max}-byte frame limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// RX FIFO overflowed; the FIFO was flushed and listening resumed
    #[error("RX FIFO overflow (flushed)")]
    RxFifoOverflow,

    /// Hardware CRC check failed on a received frame
    #[error("CRC check failed on received frame")]
    CrcError,

    /// Frame was addressed to another node
    #[error("frame addressed to 0x{actual:02X}, local address is 0x{expected:02X}")]
    AddressMismatch { expected: u8, actual: u8 },

    /// Transmission did not complete within the configured window
    #[error("transmit did not complete within {0:?}")]
    TxTimeout(Duration),

    /// No frame arrived within the configured window
    #[error("no frame received within {0:?}")]
    RxTimeout(Duration),

    /// The RX FIFO reported zero bytes
    #[error("RX FIFO empty")]
    NoData,

    /// Sensor read or initialization failed
    #[error("sensor fault: {0}")]
    Sensor(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry record could not be serialized for logging
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Weather Link
pub type Result<T> = std::result::Result<T, WeatherLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_message() {
        let err = WeatherLinkError::PayloadTooLarge { size: 70, max: 62 };
        assert_eq!(
            err.to_string(),
            "payload of 70 bytes exceeds the 62-byte frame limit"
        );
    }

    #[test]
    fn test_address_mismatch_message() {
        let err = WeatherLinkError::AddressMismatch {
            expected: 0x66,
            actual: 0x13,
        };
        assert_eq!(
            err.to_string(),
            "frame addressed to 0x13, local address is 0x66"
        );
    }

    #[test]
    fn test_timeout_messages_carry_duration() {
        let err = WeatherLinkError::TxTimeout(Duration::from_millis(100));
        assert!(err.to_string().contains("100ms"));

        let err = WeatherLinkError::RxTimeout(Duration::from_secs(1));
        assert!(err.to_string().contains("1s"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such device");
        let err: WeatherLinkError = io_err.into();
        assert!(matches!(err, WeatherLinkError::Io(_)));
    }
}
