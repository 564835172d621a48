//! # CC1101 Register Map
//!
//! Register addresses, command strobes and access-mode bits for the CC1101
//! transceiver, straight from the datasheet register table.
//!
//! A command byte is a 6-bit address plus two mode bits: bit 7 selects
//! read, bit 6 selects burst. Status-space registers (0x30 and up) share
//! their addresses with the command strobes and are only reachable with
//! the burst bit set.

/// Access-mode bits OR-ed onto a register address to form the command byte
pub mod access {
    /// Single-byte write (plain address)
    pub const WRITE_SINGLE: u8 = 0x00;
    /// Burst write (bit 6)
    pub const WRITE_BURST: u8 = 0x40;
    /// Single-byte read (bit 7)
    pub const READ_SINGLE: u8 = 0x80;
    /// Burst read (bits 7 and 6)
    pub const READ_BURST: u8 = 0xC0;
}

/// FIFO access codes (address 0x3F with the mode bits pre-applied)
pub mod fifo {
    /// Shared FIFO address, direction set by the R/W bit
    pub const ADDR: u8 = 0x3F;
    /// Single byte access to TX FIFO
    pub const TX_SINGLE: u8 = 0x3F;
    /// Burst access to TX FIFO
    pub const TX_BURST: u8 = 0x7F;
    /// Single byte access to RX FIFO
    pub const RX_SINGLE: u8 = 0xBF;
    /// Burst access to RX FIFO
    pub const RX_BURST: u8 = 0xFF;
}

/// Command strobes
pub mod strobe {
    /// Reset chip
    pub const SRES: u8 = 0x30;
    /// Enable and calibrate frequency synthesizer
    pub const SFSTXON: u8 = 0x31;
    /// Turn off crystal oscillator
    pub const SXOFF: u8 = 0x32;
    /// Calibrate frequency synthesizer and turn it off
    pub const SCAL: u8 = 0x33;
    /// Enable RX
    pub const SRX: u8 = 0x34;
    /// Enable TX (from IDLE; from RX only if the channel is clear)
    pub const STX: u8 = 0x35;
    /// Exit RX/TX, turn off frequency synthesizer
    pub const SIDLE: u8 = 0x36;
    /// Start automatic RX polling (Wake-on-Radio)
    pub const SWOR: u8 = 0x38;
    /// Enter power down mode when CSn goes high
    pub const SPWD: u8 = 0x39;
    /// Flush the RX FIFO buffer
    pub const SFRX: u8 = 0x3A;
    /// Flush the TX FIFO buffer
    pub const SFTX: u8 = 0x3B;
    /// Reset real-time clock
    pub const SWORRST: u8 = 0x3C;
    /// No operation; returns the chip status byte
    pub const SNOP: u8 = 0x3D;
}

/// Configuration registers (0x00 to 0x2E)
pub mod config {
    /// GDO2 output pin configuration
    pub const IOCFG2: u8 = 0x00;
    /// GDO1 output pin configuration
    pub const IOCFG1: u8 = 0x01;
    /// GDO0 output pin configuration
    pub const IOCFG0: u8 = 0x02;
    /// RX FIFO and TX FIFO thresholds
    pub const FIFOTHR: u8 = 0x03;
    /// Sync word, high byte
    pub const SYNC1: u8 = 0x04;
    /// Sync word, low byte
    pub const SYNC0: u8 = 0x05;
    /// Packet length
    pub const PKTLEN: u8 = 0x06;
    /// Packet automation control
    pub const PKTCTRL1: u8 = 0x07;
    /// Packet automation control
    pub const PKTCTRL0: u8 = 0x08;
    /// Device address
    pub const ADDR: u8 = 0x09;
    /// Channel number
    pub const CHANNR: u8 = 0x0A;
    /// Frequency synthesizer control
    pub const FSCTRL1: u8 = 0x0B;
    /// Frequency synthesizer control
    pub const FSCTRL0: u8 = 0x0C;
    /// Frequency control word, high byte
    pub const FREQ2: u8 = 0x0D;
    /// Frequency control word, middle byte
    pub const FREQ1: u8 = 0x0E;
    /// Frequency control word, low byte
    pub const FREQ0: u8 = 0x0F;
    /// Modem configuration (data rate exponent, channel bandwidth)
    pub const MDMCFG4: u8 = 0x10;
    /// Modem configuration (data rate mantissa)
    pub const MDMCFG3: u8 = 0x11;
    /// Modem configuration (modulation format, sync mode)
    pub const MDMCFG2: u8 = 0x12;
    /// Modem configuration
    pub const MDMCFG1: u8 = 0x13;
    /// Modem configuration
    pub const MDMCFG0: u8 = 0x14;
    /// Modem deviation setting
    pub const DEVIATN: u8 = 0x15;
    /// Main Radio Control State Machine configuration
    pub const MCSM2: u8 = 0x16;
    /// Main Radio Control State Machine configuration
    pub const MCSM1: u8 = 0x17;
    /// Main Radio Control State Machine configuration
    pub const MCSM0: u8 = 0x18;
    /// Frequency Offset Compensation configuration
    pub const FOCCFG: u8 = 0x19;
    /// Bit Synchronization configuration
    pub const BSCFG: u8 = 0x1A;
    /// AGC control
    pub const AGCCTRL2: u8 = 0x1B;
    /// AGC control
    pub const AGCCTRL1: u8 = 0x1C;
    /// AGC control
    pub const AGCCTRL0: u8 = 0x1D;
    /// High byte Event0 timeout
    pub const WOREVT1: u8 = 0x1E;
    /// Low byte Event0 timeout
    pub const WOREVT0: u8 = 0x1F;
    /// Wake On Radio control
    pub const WORCTRL: u8 = 0x20;
    /// Front end RX configuration
    pub const FREND1: u8 = 0x21;
    /// Front end TX configuration
    pub const FREND0: u8 = 0x22;
    /// Frequency synthesizer calibration
    pub const FSCAL3: u8 = 0x23;
    /// Frequency synthesizer calibration
    pub const FSCAL2: u8 = 0x24;
    /// Frequency synthesizer calibration
    pub const FSCAL1: u8 = 0x25;
    /// Frequency synthesizer calibration
    pub const FSCAL0: u8 = 0x26;
    /// RC oscillator configuration
    pub const RCCTRL1: u8 = 0x27;
    /// RC oscillator configuration
    pub const RCCTRL0: u8 = 0x28;
}

/// Status registers (0x30 to 0x3B, read-only, burst bit required)
pub mod status {
    /// Part number
    pub const PARTNUM: u8 = 0x30;
    /// Current version number
    pub const VERSION: u8 = 0x31;
    /// Frequency offset estimate
    pub const FREQEST: u8 = 0x32;
    /// Demodulator estimate for link quality; bit 7 is the CRC-OK flag
    pub const LQI: u8 = 0x33;
    /// Received signal strength indication
    pub const RSSI: u8 = 0x34;
    /// Control state machine state
    pub const MARCSTATE: u8 = 0x35;
    /// Current GDOx status and packet status flags
    pub const PKTSTATUS: u8 = 0x38;
    /// Underflow flag and number of bytes in the TX FIFO
    pub const TXBYTES: u8 = 0x3A;
    /// Overflow flag and number of bytes in the RX FIFO
    pub const RXBYTES: u8 = 0x3B;
}

/// MARCSTATE values of interest to the link layer (lower 5 bits)
pub mod machine {
    /// Idle
    pub const IDLE: u8 = 0x01;
    /// Receiving
    pub const RX: u8 = 0x0D;
    /// RX FIFO has overflowed
    pub const RXFIFO_OVERFLOW: u8 = 0x11;
    /// Transmitting
    pub const TX: u8 = 0x13;
    /// TX FIFO has underflowed
    pub const TXFIFO_UNDERFLOW: u8 = 0x16;
}

/// Mask for the state bits of MARCSTATE
pub const MARCSTATE_MASK: u8 = 0x1F;

/// Mask for the byte count bits of RXBYTES/TXBYTES
pub const FIFO_BYTES_MASK: u8 = 0x7F;

/// IOCFG value: the GDO pin asserts on sync word and deasserts at the end
/// of the packet. The link layer polls GDO0 under this function and no
/// other, so it is written verbatim rather than taken from tuning.
pub const GDO_CFG_SYNC_PACKET: u8 = 0x06;
