//! # Link Quality
//!
//! Converts the raw RSSI byte the radio reports into dBm and folds it
//! into a coarse three-band classification for operator-facing output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Datasheet RSSI offset for the 433 MHz band
const RSSI_OFFSET_DBM: i16 = 74;

/// Received signal strength in a form a human can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkQuality {
    /// Below -100 dBm, at the edge of the link budget
    VeryWeak,
    /// Between -100 and -70 dBm
    Moderate,
    /// -70 dBm or better
    Strong,
}

impl LinkQuality {
    /// Classify a signal strength in dBm
    pub fn from_dbm(dbm: i16) -> Self {
        if dbm < -100 {
            LinkQuality::VeryWeak
        } else if dbm < -70 {
            LinkQuality::Moderate
        } else {
            LinkQuality::Strong
        }
    }
}

impl fmt::Display for LinkQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkQuality::VeryWeak => write!(f, "very weak"),
            LinkQuality::Moderate => write!(f, "moderate"),
            LinkQuality::Strong => write!(f, "strong"),
        }
    }
}

/// Convert the radio's raw RSSI byte to dBm
///
/// The byte is a two's-complement half-dB reading offset by 74 dB, per
/// the CC1101 datasheet conversion for the 433 MHz band.
pub fn rssi_to_dbm(raw: u8) -> i16 {
    let raw = i16::from(raw);
    if raw >= 128 {
        (raw - 256) / 2 - RSSI_OFFSET_DBM
    } else {
        raw / 2 - RSSI_OFFSET_DBM
    }
}
