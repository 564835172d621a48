//! # Radio Frame Layout
//!
//! Builds and parses the variable-length frames the CC1101 moves through
//! its FIFOs.
//!
//! On the air a frame is `[length][address][payload...]`, where the length
//! byte counts the address and payload but not itself. On reception the
//! chip appends two status bytes, RSSI then LQI, with the CRC result in
//! the top bit of the LQI byte. Both FIFOs are 64 bytes deep, so the
//! frame proper is capped at 62 bytes to leave room for the appended pair.

use crate::error::{Result, WeatherLinkError};

/// Depth of the TX and RX FIFOs in bytes
const FIFO_SIZE: usize = 64;

/// Number of status bytes the chip appends to each received frame
pub const STATUS_LEN: usize = 2;

/// Largest frame (length byte, address and payload) that fits the FIFO
/// alongside the appended status bytes
pub const MAX_FRAME_LEN: usize = FIFO_SIZE - STATUS_LEN;

/// Largest payload a frame can carry
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - 2;

/// CRC-OK flag in the appended LQI byte
pub const CRC_OK_MASK: u8 = 0x80;

/// A received frame borrowed from the raw FIFO contents
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    /// Destination address carried by the frame
    pub address: u8,
    /// Payload bytes, without the framing or status bytes
    pub payload: &'a [u8],
    /// Raw RSSI byte appended by the chip
    pub rssi: u8,
    /// LQI byte appended by the chip, CRC flag included
    pub lqi: u8,
}

impl<'a> ParsedFrame<'a> {
    /// Whether the chip's CRC check passed for this frame
    pub fn crc_ok(&self) -> bool {
        self.lqi & CRC_OK_MASK != 0
    }

    /// Link quality indicator with the CRC flag masked off
    pub fn lqi_value(&self) -> u8 {
        self.lqi & !CRC_OK_MASK
    }
}

/// Build the on-air frame for a payload addressed to `dest`
///
/// # Errors
///
/// Returns `PayloadTooLarge` if the payload exceeds [`MAX_PAYLOAD_LEN`];
/// nothing is allocated in that case.
pub fn build_frame(dest: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(WeatherLinkError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.push(payload.len() as u8 + 1); // address byte counts, length byte does not
    frame.push(dest);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Parse raw FIFO contents into a frame
///
/// Expects the complete readout for one packet: the frame itself plus the
/// two appended status bytes. An empty readout reports `NoData`. The
/// embedded length byte must agree with the number of bytes actually
/// read; a mismatch means the FIFO readout went out of sync and is
/// reported as `BusFault`.
pub fn parse_frame(raw: &[u8]) -> Result<ParsedFrame<'_>> {
    if raw.is_empty() {
        return Err(WeatherLinkError::NoData);
    }
    if raw.len() < 2 + STATUS_LEN {
        return Err(WeatherLinkError::BusFault(format!(
            "FIFO readout of {} bytes is too short for a frame",
            raw.len()
        )));
    }

    let declared = raw[0] as usize;
    if declared != raw.len() - 1 - STATUS_LEN {
        return Err(WeatherLinkError::BusFault(format!(
            "frame declares {} bytes but {} were read",
            declared,
            raw.len() - 1 - STATUS_LEN
        )));
    }

    Ok(ParsedFrame {
        address: raw[1],
        payload: &raw[2..raw.len() - STATUS_LEN],
        rssi: raw[raw.len() - 2],
        lqi: raw[raw.len() - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_frame_layout() {
        let frame = build_frame(0x66, &[0xDE, 0xAD, 0xBE]).unwrap();
        assert_eq!(frame, vec![0x04, 0x66, 0xDE, 0xAD, 0xBE]);
    }

    #[test]
    fn test_build_frame_empty_payload() {
        let frame = build_frame(0x66, &[]).unwrap();
        assert_eq!(frame, vec![0x01, 0x66]);
    }

    #[test]
    fn test_build_frame_at_payload_limit() {
        let payload = [0xAB; MAX_PAYLOAD_LEN];
        let frame = build_frame(0x66, &payload).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_LEN);
        assert_eq!(frame[0], MAX_PAYLOAD_LEN as u8 + 1);
    }

    #[test]
    fn test_build_frame_rejects_oversized_payload() {
        let payload = [0u8; MAX_PAYLOAD_LEN + 1];
        let result = build_frame(0x66, &payload);

        match result {
            Err(WeatherLinkError::PayloadTooLarge { size, max }) => {
                assert_eq!(size, MAX_PAYLOAD_LEN + 1);
                assert_eq!(max, MAX_PAYLOAD_LEN);
            }
            other => panic!("Expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip_through_fifo_readout() {
        let payload = [0x01, 0x02, 0x03, 0x04];
        let mut raw = build_frame(0x42, &payload).unwrap();
        raw.push(0x32); // RSSI
        raw.push(CRC_OK_MASK | 0x2F); // LQI with CRC passed

        let parsed = parse_frame(&raw).unwrap();
        assert_eq!(parsed.address, 0x42);
        assert_eq!(parsed.payload, &payload);
        assert_eq!(parsed.rssi, 0x32);
        assert!(parsed.crc_ok());
        assert_eq!(parsed.lqi_value(), 0x2F);
    }

    #[test]
    fn test_parse_detects_crc_failure() {
        let parsed = parse_frame(&[0x02, 0x66, 0xAA, 0x32, 0x2F]).unwrap();
        assert!(!parsed.crc_ok());
        assert_eq!(parsed.lqi_value(), 0x2F);
    }

    #[test]
    fn test_parse_rejects_length_mismatch() {
        // Declares 5 payload+address bytes, readout only carries 3
        let result = parse_frame(&[0x05, 0x66, 0xAA, 0xBB, 0x32, 0x80]);
        assert!(matches!(result, Err(WeatherLinkError::BusFault(_))));
    }

    #[test]
    fn test_parse_empty_readout_reports_no_data() {
        // An empty FIFO means nothing arrived, not a broken transfer
        assert!(matches!(parse_frame(&[]), Err(WeatherLinkError::NoData)));
    }

    #[test]
    fn test_parse_rejects_short_readout() {
        let result = parse_frame(&[0x01, 0x66, 0x32]);
        assert!(matches!(result, Err(WeatherLinkError::BusFault(_))));
    }

    #[test]
    fn test_parse_minimal_frame() {
        let parsed = parse_frame(&[0x01, 0x66, 0x80, 0x81]).unwrap();
        assert_eq!(parsed.address, 0x66);
        assert!(parsed.payload.is_empty());
        assert!(parsed.crc_ok());
    }
}
