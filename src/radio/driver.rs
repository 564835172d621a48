//! # CC1101 Register Access
//!
//! The lowest layer of the radio stack: command-byte encoding, chip-select
//! framing and the reset sequence.
//!
//! This module handles:
//! - Single and burst register reads and writes
//! - Command strobes and status register reads
//! - TX/RX FIFO access
//! - The power-on reset pulse and post-reset settle delay
//!
//! Every transaction pulls the chip-select line low before the command byte
//! and releases it afterwards, on the error paths included. Bus and pin
//! failures surface as `BusFault` so callers never see transport-specific
//! error types.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::error::{Result, WeatherLinkError};
use crate::radio::registers::{access, fifo, strobe};

/// Width of the chip-select reset pulse in milliseconds
const RESET_PULSE_MS: u64 = 10;

/// Settle time after the SRES strobe before any register access
const RESET_SETTLE_MS: u64 = 40;

/// CC1101 transceiver behind an SPI bus, a chip-select line and the GDO0
/// packet line
pub struct Cc1101<SPI, CS, GDO0> {
    spi: SPI,
    chip_select: CS,
    packet_line: GDO0,
}

impl<SPI, CS, GDO0, SpiE, PinE, LineE> Cc1101<SPI, CS, GDO0>
where
    SPI: Transfer<u8, Error = SpiE> + Write<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
    GDO0: InputPin<Error = LineE>,
    SpiE: Debug,
    PinE: Debug,
    LineE: Debug,
{
    /// Create a driver over an already opened bus
    ///
    /// The chip-select line must idle high; `reset` has to run before the
    /// chip will accept register writes.
    pub fn new(spi: SPI, chip_select: CS, packet_line: GDO0) -> Self {
        Self {
            spi,
            chip_select,
            packet_line,
        }
    }

    /// Pulse the reset sequence and wait for the chip to settle
    ///
    /// Holds chip select low for 10 ms, releases it for another 10 ms,
    /// issues the SRES strobe and then waits 40 ms before returning. The
    /// chip ignores register traffic until this sequence has completed.
    ///
    /// # Errors
    ///
    /// Returns `BusFault` if the chip-select line or the SPI bus fails.
    pub fn reset(&mut self) -> Result<()> {
        self.chip_select
            .set_low()
            .map_err(|e| bus_fault("driving chip select low", e))?;
        thread::sleep(Duration::from_millis(RESET_PULSE_MS));
        self.chip_select
            .set_high()
            .map_err(|e| bus_fault("driving chip select high", e))?;
        thread::sleep(Duration::from_millis(RESET_PULSE_MS));

        self.strobe(strobe::SRES)?;
        thread::sleep(Duration::from_millis(RESET_SETTLE_MS));
        Ok(())
    }

    /// Issue a single-byte command strobe
    pub fn strobe(&mut self, strobe: u8) -> Result<()> {
        self.with_selected(|spi| spi.write(&[strobe]))
    }

    /// Read one configuration register
    pub fn read_register(&mut self, addr: u8) -> Result<u8> {
        let mut frame = [addr | access::READ_SINGLE, 0];
        self.with_selected(|spi| spi.transfer(&mut frame).map(|_| ()))?;
        Ok(frame[1])
    }

    /// Write one configuration register
    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<()> {
        self.with_selected(|spi| spi.write(&[addr | access::WRITE_SINGLE, value]))
    }

    /// Read a status register (MARCSTATE, RXBYTES, RSSI, ...)
    ///
    /// Status registers share their address space with the command strobes,
    /// so the read must carry the burst bit to reach the register instead
    /// of firing the strobe.
    pub fn read_status(&mut self, addr: u8) -> Result<u8> {
        let mut frame = [addr | access::READ_BURST, 0];
        self.with_selected(|spi| spi.transfer(&mut frame).map(|_| ()))?;
        Ok(frame[1])
    }

    /// Read consecutive registers starting at `addr` into `buf`
    pub fn read_burst(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        let mut frame = vec![0u8; buf.len() + 1];
        frame[0] = addr | access::READ_BURST;
        self.with_selected(|spi| spi.transfer(&mut frame).map(|_| ()))?;
        buf.copy_from_slice(&frame[1..]);
        Ok(())
    }

    /// Write consecutive registers starting at `addr`
    pub fn write_burst(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(addr | access::WRITE_BURST);
        frame.extend_from_slice(data);
        self.with_selected(|spi| spi.write(&frame))
    }

    /// Burst-write a frame into the TX FIFO
    pub fn write_fifo(&mut self, data: &[u8]) -> Result<()> {
        self.write_burst(fifo::ADDR, data)
    }

    /// Burst-read `buf.len()` bytes out of the RX FIFO
    pub fn read_fifo(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_burst(fifo::ADDR, buf)
    }

    /// Sample the GDO0 packet line
    ///
    /// With the sync-word GDO configuration the line rises when a sync word
    /// has been sent or received and falls again at the end of the packet.
    pub fn packet_line_high(&self) -> Result<bool> {
        self.packet_line
            .is_high()
            .map_err(|e| bus_fault("reading GDO0 line", e))
    }

    /// Run one SPI transaction with chip select held low
    ///
    /// Chip select is released before the result is inspected, so a failed
    /// transfer never leaves the chip selected.
    fn with_selected<T>(
        &mut self,
        op: impl FnOnce(&mut SPI) -> std::result::Result<T, SpiE>,
    ) -> Result<T> {
        self.chip_select
            .set_low()
            .map_err(|e| bus_fault("driving chip select low", e))?;
        let outcome = op(&mut self.spi);
        let release = self.chip_select.set_high();

        let value = outcome.map_err(|e| bus_fault("SPI transaction failed", e))?;
        release.map_err(|e| bus_fault("driving chip select high", e))?;
        Ok(value)
    }
}

fn bus_fault(context: &str, err: impl Debug) -> WeatherLinkError {
    WeatherLinkError::BusFault(format!("{}: {:?}", context, err))
}
