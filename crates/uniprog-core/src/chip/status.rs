//! Status register decoding

use bitflags::bitflags;
use core::fmt;

bitflags! {
    /// NAND status byte as returned by READ STATUS (0x70)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NandStatus: u8 {
        /// Last program or erase failed
        const FAIL          = 1 << 0;
        /// Device is ready (not busy)
        const READY         = 1 << 6;
        /// Write-protect bit
        const WRITE_PROTECT = 1 << 7;
    }
}

bitflags! {
    /// Serial NOR status register 1 as returned by RDSR (0x05)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiStatus: u8 {
        /// Write in progress
        const BUSY = 1 << 0;
        /// Write enable latch
        const WEL  = 1 << 1;
        /// Block protect bit 0
        const BP0  = 1 << 2;
        /// Block protect bit 1
        const BP1  = 1 << 3;
        /// Block protect bit 2
        const BP2  = 1 << 4;
        /// Block protect bit 3
        const BP3  = 1 << 5;
        /// Status register write disable
        const SRWD = 1 << 7;
    }
}

impl NandStatus {
    /// Decode a raw status byte, keeping unknown bits
    pub const fn from_raw(raw: u8) -> Self {
        Self::from_bits_retain(raw)
    }

    /// True if the last program/erase reported failure
    pub const fn failed(&self) -> bool {
        self.contains(Self::FAIL)
    }
}

impl SpiStatus {
    /// Decode a raw status byte, keeping unknown bits
    pub const fn from_raw(raw: u8) -> Self {
        Self::from_bits_retain(raw)
    }

    /// The 4-bit block protection field (bits 2..=5)
    pub const fn block_protect(&self) -> u8 {
        (self.bits() >> 2) & 0x0F
    }
}

/// Presence and readiness of an I2C EEPROM
///
/// These parts have no status register; both flags come from address
/// acknowledgement probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromStatus {
    /// The device acknowledged its address
    pub present: bool,
    /// The device also acknowledged a memory pointer write
    pub ready: bool,
}

/// Status of whichever technology is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Parallel NAND
    Nand(NandStatus),
    /// Serial NOR
    SpiNor(SpiStatus),
    /// I2C EEPROM
    Eeprom(EepromStatus),
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

impl fmt::Display for NandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: 0x{:02X}", self.bits())?;
        writeln!(f, "Program/Erase Failed: {}", yes_no(self.failed()))?;
        let ready = if self.contains(Self::READY) { "Ready" } else { "Busy" };
        writeln!(f, "Ready/Busy: {}", ready)?;
        write!(f, "Write Protected: {}", yes_no(self.contains(Self::WRITE_PROTECT)))
    }
}

impl fmt::Display for SpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status Register: 0x{:02X}", self.bits())?;
        writeln!(f, "Busy: {}", yes_no(self.contains(Self::BUSY)))?;
        let wel = if self.contains(Self::WEL) { "Enabled" } else { "Disabled" };
        writeln!(f, "Write Enable Latch: {}", wel)?;
        writeln!(f, "Block Protection: {:04b}", self.block_protect())?;
        write!(f, "Write Protect Enable: {}", yes_no(self.contains(Self::SRWD)))
    }
}

impl fmt::Display for EepromStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device present: {}", yes_no(self.present))?;
        if self.present {
            write!(f, "\nDevice ready: {}", yes_no(self.ready))?;
        }
        Ok(())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nand(s) => s.fmt(f),
            Self::SpiNor(s) => s.fmt(f),
            Self::Eeprom(s) => s.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_nand_status_bits() {
        let status = NandStatus::from_raw(0xC1);
        assert!(status.failed());
        assert!(status.contains(NandStatus::READY));
        assert!(!NandStatus::from_raw(0xC0).failed());
    }

    #[test]
    fn test_nand_status_display() {
        let text = format!("{}", NandStatus::from_raw(0x40));
        assert_eq!(
            text,
            "Status: 0x40\nProgram/Erase Failed: No\nReady/Busy: Ready\nWrite Protected: No"
        );
    }

    #[test]
    fn test_spi_status_block_protect() {
        let status = SpiStatus::from_raw(0b1011_1110);
        assert_eq!(status.block_protect(), 0b1111);
        assert!(status.contains(SpiStatus::WEL));
        assert!(!status.contains(SpiStatus::BUSY));
        assert!(format!("{}", status).contains("Block Protection: 1111"));
    }

    #[test]
    fn test_absent_eeprom_hides_ready() {
        let status = EepromStatus {
            present: false,
            ready: false,
        };
        assert_eq!(format!("{}", status), "Device present: No");
    }
}
