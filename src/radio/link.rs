//! # Radio Link State Machine
//!
//! Drives the CC1101 between IDLE, TX and RX and carries frames across it.
//!
//! This module handles:
//! - One-time radio configuration from the tuning settings
//! - Transmit: flush, load FIFO, strobe TX, wait out the packet on GDO0
//! - Receive: arm RX, wait for a packet, drain and validate the FIFO
//! - Recovery back to a clean state after overflow, CRC or timeout
//!
//! Every wait is bounded. A transmit that never completes surfaces as
//! `TxTimeout` and a quiet receive window as `RxTimeout`; in both cases
//! the chip is left in a known state, never stuck mid-packet.

use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use tracing::{debug, info, warn};

use crate::config::RadioConfig;
use crate::error::{Result, WeatherLinkError};
use crate::radio::driver::Cc1101;
use crate::radio::frame::{self, build_frame, parse_frame};
use crate::radio::quality::{rssi_to_dbm, LinkQuality};
use crate::radio::registers::{
    machine, status, strobe, FIFO_BYTES_MASK, GDO_CFG_SYNC_PACKET, MARCSTATE_MASK,
};

/// Interval between polls of GDO0 and RXBYTES
const LINE_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Which of the radio's three operating states the link believes it is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Neither transmitting nor listening
    Idle,
    /// A transmit sequence is in flight
    Transmit,
    /// The receiver is armed and listening
    Receive,
}

/// Outcome of a successful receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Address the frame was sent to
    pub address: u8,
    /// Number of payload bytes copied into the caller's buffer
    pub payload_len: usize,
    /// Signal strength of the frame in dBm
    pub rssi_dbm: i16,
    /// Link quality indicator with the CRC flag masked off
    pub lqi: u8,
    /// Classification of the signal strength
    pub quality: LinkQuality,
}

/// Packet link over a CC1101 transceiver
///
/// Owns the driver and tracks the chip's operating mode so that send and
/// receive can restore the right posture after errors. All timing comes
/// from the radio configuration; nothing here blocks without a deadline.
pub struct RadioLink<SPI, CS, GDO0> {
    driver: Cc1101<SPI, CS, GDO0>,
    config: RadioConfig,
    address: u8,
    mode: LinkMode,
}

impl<SPI, CS, GDO0, SpiE, PinE, LineE> RadioLink<SPI, CS, GDO0>
where
    SPI: Transfer<u8, Error = SpiE> + Write<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
    GDO0: InputPin<Error = LineE>,
    SpiE: Debug,
    PinE: Debug,
    LineE: Debug,
{
    /// Create a link over a driver that has not been configured yet
    ///
    /// `address` is this node's own address; received frames carrying any
    /// other address are rejected. Call [`configure`](Self::configure)
    /// before the first send or receive.
    pub fn new(driver: Cc1101<SPI, CS, GDO0>, config: RadioConfig, address: u8) -> Self {
        Self {
            driver,
            config,
            address,
            mode: LinkMode::Idle,
        }
    }

    /// Reset the chip and program the packet engine and RF tuning
    ///
    /// Runs the full reset sequence, probes the part and version codes for
    /// the log, writes every tuning register from the configuration and
    /// leaves the chip idle with both FIFOs flushed.
    ///
    /// # Errors
    ///
    /// Returns `BusFault` if any SPI or GPIO operation fails.
    pub fn configure(&mut self) -> Result<()> {
        use crate::radio::registers::config as reg;

        self.driver.reset()?;

        let part = self.driver.read_status(status::PARTNUM)?;
        let version = self.driver.read_status(status::VERSION)?;
        if version == 0x00 || version == 0xFF {
            warn!(
                "Radio version register reads 0x{:02X}, chip may not be responding",
                version
            );
        } else {
            debug!("Radio part 0x{:02X} version 0x{:02X}", part, version);
        }

        let tuning = &self.config.tuning;
        let writes = [
            (reg::IOCFG0, GDO_CFG_SYNC_PACKET),
            (reg::SYNC1, tuning.sync1),
            (reg::SYNC0, tuning.sync0),
            (reg::PKTLEN, (frame::MAX_FRAME_LEN - 1) as u8),
            (reg::PKTCTRL1, tuning.pktctrl1),
            (reg::PKTCTRL0, tuning.pktctrl0),
            (reg::ADDR, self.address),
            (reg::CHANNR, self.config.channel),
            (reg::FREQ2, tuning.freq2),
            (reg::FREQ1, tuning.freq1),
            (reg::FREQ0, tuning.freq0),
            (reg::MDMCFG4, tuning.mdmcfg4),
            (reg::MDMCFG3, tuning.mdmcfg3),
            (reg::MDMCFG2, tuning.mdmcfg2),
        ];
        for (addr, value) in writes {
            self.driver.write_register(addr, value)?;
        }

        self.driver.strobe(strobe::SIDLE)?;
        self.driver.strobe(strobe::SFTX)?;
        self.driver.strobe(strobe::SFRX)?;
        self.mode = LinkMode::Idle;

        info!(
            "Radio configured on channel {} as address 0x{:02X}",
            self.config.channel, self.address
        );
        Ok(())
    }

    /// Transmit a payload to `dest`
    ///
    /// The payload is framed, loaded into a freshly flushed TX FIFO and
    /// strobed out. Completion is tracked on GDO0: the line rises when the
    /// sync word leaves and falls at the end of the packet. Both edges
    /// share one deadline. The chip ends up idle with the TX FIFO flushed
    /// whether or not the transmit succeeded.
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge` if the payload exceeds the frame limit; the bus
    ///   is not touched in that case
    /// - `TxTimeout` if GDO0 does not complete the packet within the
    ///   configured transmit timeout
    /// - `BusFault` for SPI or GPIO failures
    pub fn send(&mut self, payload: &[u8], dest: u8) -> Result<()> {
        let frame = build_frame(dest, payload)?;

        self.driver.strobe(strobe::SIDLE)?;
        self.driver.strobe(strobe::SFTX)?;
        self.mode = LinkMode::Idle;

        self.driver.write_fifo(&frame)?;
        self.driver.strobe(strobe::STX)?;
        self.mode = LinkMode::Transmit;

        let timeout = self.config.tx_timeout();
        let deadline = Instant::now() + timeout;
        let mut outcome =
            self.wait_packet_line(true, deadline, timeout, WeatherLinkError::TxTimeout);
        if outcome.is_ok() {
            outcome = self.wait_packet_line(false, deadline, timeout, WeatherLinkError::TxTimeout);
        }

        // Clean idle on success and timeout alike
        self.driver.strobe(strobe::SIDLE)?;
        self.driver.strobe(strobe::SFTX)?;
        self.mode = LinkMode::Idle;
        outcome?;

        debug!(
            "Transmitted {} byte frame to 0x{:02X}",
            frame.len(),
            dest
        );
        Ok(())
    }

    /// Arm the receiver
    ///
    /// Drops to idle, flushes the RX FIFO and strobes RX, in that order.
    /// The chip then listens until a packet arrives or the mode changes.
    pub fn listen(&mut self) -> Result<()> {
        self.driver.strobe(strobe::SIDLE)?;
        self.driver.strobe(strobe::SFRX)?;
        self.driver.strobe(strobe::SRX)?;
        self.mode = LinkMode::Receive;
        Ok(())
    }

    /// Wait for one frame and copy its payload into `buf`
    ///
    /// Arms the receiver first if it is not already listening, then waits
    /// for GDO0 to report a packet. The FIFO byte count is read until two
    /// successive reads agree before anything is drained, so a packet still
    /// streaming in is never cut short. All waiting shares the configured
    /// receive timeout.
    ///
    /// After a frame is drained the receiver is re-armed, so a loop of
    /// `receive` calls keeps listening between packets.
    ///
    /// # Errors
    ///
    /// - `RxTimeout` if no packet starts within the window; the receiver
    ///   keeps listening
    /// - `NoData` if the packet line fired but the FIFO is empty; the FIFO
    ///   is left alone and RX is re-strobed
    /// - `RxFifoOverflow` if the chip reports overflow; the FIFO is flushed
    ///   and the receiver re-armed
    /// - `CrcError` if the chip's CRC check failed; `buf` is zeroed
    /// - `AddressMismatch` if the frame carries another node's address;
    ///   `buf` is untouched
    /// - `BusFault` for SPI or GPIO failures, and for FIFO readouts whose
    ///   length byte disagrees with the byte count
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<Received> {
        if self.mode != LinkMode::Receive {
            self.listen()?;
        }

        let timeout = self.config.rx_timeout();
        let deadline = Instant::now() + timeout;
        self.wait_packet_line(true, deadline, timeout, WeatherLinkError::RxTimeout)?;

        let mut count = self.driver.read_status(status::RXBYTES)? & FIFO_BYTES_MASK;
        loop {
            let again = self.driver.read_status(status::RXBYTES)? & FIFO_BYTES_MASK;
            if again == count {
                break;
            }
            count = again;
            if Instant::now() >= deadline {
                return Err(WeatherLinkError::RxTimeout(timeout));
            }
            thread::sleep(LINE_POLL_INTERVAL);
        }

        if count == 0 {
            // Sync fired but nothing was kept; re-arm without flushing
            self.driver.strobe(strobe::SRX)?;
            return Err(WeatherLinkError::NoData);
        }

        let marc = self.driver.read_status(status::MARCSTATE)? & MARCSTATE_MASK;
        if marc == machine::RXFIFO_OVERFLOW {
            warn!("RX FIFO overflow, flushing");
            self.listen()?;
            return Err(WeatherLinkError::RxFifoOverflow);
        }

        let mut raw = vec![0u8; count as usize];
        self.driver.read_fifo(&mut raw)?;

        let outcome = self.accept_frame(&raw, buf);
        self.listen()?;
        outcome
    }

    /// Validate a drained FIFO readout and copy the payload out
    fn accept_frame(&self, raw: &[u8], buf: &mut [u8]) -> Result<Received> {
        let parsed = parse_frame(raw)?;

        if !parsed.crc_ok() {
            for byte in buf.iter_mut() {
                *byte = 0;
            }
            return Err(WeatherLinkError::CrcError);
        }

        if parsed.address != self.address {
            return Err(WeatherLinkError::AddressMismatch {
                expected: self.address,
                actual: parsed.address,
            });
        }

        if parsed.payload.len() > buf.len() {
            return Err(WeatherLinkError::BusFault(format!(
                "receive buffer of {} bytes cannot hold a {} byte payload",
                buf.len(),
                parsed.payload.len()
            )));
        }
        buf[..parsed.payload.len()].copy_from_slice(parsed.payload);

        let rssi_dbm = rssi_to_dbm(parsed.rssi);
        let quality = LinkQuality::from_dbm(rssi_dbm);
        debug!(
            "Received {} byte payload at {} dBm ({})",
            parsed.payload.len(),
            rssi_dbm,
            quality
        );

        Ok(Received {
            address: parsed.address,
            payload_len: parsed.payload.len(),
            rssi_dbm,
            lqi: parsed.lqi_value(),
            quality,
        })
    }

    /// Drop the chip back to idle without flushing anything
    pub fn idle(&mut self) -> Result<()> {
        self.driver.strobe(strobe::SIDLE)?;
        self.mode = LinkMode::Idle;
        Ok(())
    }

    /// Current signal strength in dBm, usable while listening
    pub fn signal_strength(&mut self) -> Result<i16> {
        let raw = self.driver.read_status(status::RSSI)?;
        Ok(rssi_to_dbm(raw))
    }

    /// The mode the link believes the chip is in
    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Poll GDO0 until it reaches `level` or the deadline passes
    fn wait_packet_line(
        &self,
        level: bool,
        deadline: Instant,
        timeout: Duration,
        err: fn(Duration) -> WeatherLinkError,
    ) -> Result<()> {
        while self.driver.packet_line_high()? != level {
            if Instant::now() >= deadline {
                return Err(err(timeout));
            }
            thread::sleep(LINE_POLL_INTERVAL);
        }
        Ok(())
    }
}
