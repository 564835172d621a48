//! # Radio Module
//!
//! CC1101 packet transport for the sensor-to-base link.
//!
//! This module handles:
//! - Register, strobe and FIFO access over SPI (`driver`)
//! - Variable-length frame building and parsing (`frame`)
//! - The IDLE/TX/RX link state machine (`link`)
//! - RSSI conversion and link quality classification (`quality`)
//!
//! The driver layer is generic over the `embedded-hal` blocking traits so
//! the state machine can be exercised against scripted mock buses; on the
//! device it runs over `spidev` and character-device GPIO lines.

pub mod driver;
pub mod frame;
pub mod link;
pub mod quality;
pub mod registers;

pub use driver::Cc1101;
pub use frame::{MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
pub use link::{LinkMode, RadioLink, Received};
pub use quality::{rssi_to_dbm, LinkQuality};
