//! # Weather Link Library
//!
//! Telemetry link for a solar-powered weather station: periodic sensor
//! readings packed into fixed-layout records and exchanged with a base
//! station over a CC1101 sub-GHz packet radio.
//!
//! This library provides the radio packet transport (register access,
//! strobes, FIFO framing, the TX/RX state machine, link quality), the
//! I2C sensor drivers that produce the telemetry record, and the record
//! serialization and logging used on both ends of the link.

pub mod bus;
pub mod config;
pub mod error;
pub mod radio;
pub mod sensors;
pub mod telemetry;
