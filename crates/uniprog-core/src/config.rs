//! Per-technology geometry and timing parameters
//!
//! Every field has a default matching common parts (512 B NAND pages,
//! 256 B NOR pages, 8 B EEPROM pages). The binary deserializes these from
//! its TOML configuration file when the `std` feature is enabled.

use crate::error::{Error, Result};

/// Lowest 7-bit address that is not reserved by the I2C specification
pub const BUS_ADDRESS_MIN: u8 = 0x08;
/// Highest 7-bit address that is not reserved by the I2C specification
pub const BUS_ADDRESS_MAX: u8 = 0x77;

/// A validated 7-bit I2C device address in `0x08..=0x77`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(try_from = "u8", into = "u8"))]
pub struct BusAddress(u8);

impl BusAddress {
    /// Default EEPROM address (24Cxx with A2..A0 tied low)
    pub const DEFAULT: Self = Self(0x50);

    /// Validate a raw 7-bit address
    pub const fn new(addr: u8) -> Result<Self> {
        if addr >= BUS_ADDRESS_MIN && addr <= BUS_ADDRESS_MAX {
            Ok(Self(addr))
        } else {
            Err(Error::InvalidInput)
        }
    }

    /// Raw 7-bit address
    pub const fn get(self) -> u8 {
        self.0
    }

    /// True for the 0x50..=0x57 range used by 24Cxx-style EEPROMs
    pub const fn is_eeprom_range(self) -> bool {
        self.0 >= 0x50 && self.0 <= 0x57
    }

    /// Iterate over every valid address in ascending order
    pub fn all() -> impl Iterator<Item = BusAddress> {
        (BUS_ADDRESS_MIN..=BUS_ADDRESS_MAX).map(BusAddress)
    }
}

impl Default for BusAddress {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = Error;

    fn try_from(addr: u8) -> Result<Self> {
        Self::new(addr)
    }
}

impl From<BusAddress> for u8 {
    fn from(addr: BusAddress) -> u8 {
        addr.0
    }
}

impl core::fmt::Display for BusAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// NAND geometry and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct NandConfig {
    /// Bytes per page (main area only)
    pub page_size: u32,
    /// Bytes per erase block
    pub block_size: u32,
    /// Number of blocks on the device
    pub block_count: u32,
    /// Bound on every ready wait
    pub ready_timeout_ms: u32,
}

impl NandConfig {
    /// Pages per erase block
    pub const fn pages_per_block(&self) -> u32 {
        self.block_size / self.page_size
    }
}

impl Default for NandConfig {
    fn default() -> Self {
        Self {
            page_size: 512,
            block_size: 16 * 1024,
            block_count: 2048,
            ready_timeout_ms: 1000,
        }
    }
}

/// Serial NOR geometry and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct SpiNorConfig {
    /// Page program size
    pub page_size: u32,
    /// Bound on a single page program
    pub program_timeout_ms: u32,
    /// Bound on a 4 KiB sector erase
    pub sector_erase_timeout_ms: u32,
    /// Bound on a 64 KiB block erase
    pub block_erase_timeout_ms: u32,
    /// Bound on a full chip erase
    pub chip_erase_timeout_ms: u32,
    /// Progress report interval while erasing
    pub progress_interval_ms: u32,
}

impl Default for SpiNorConfig {
    fn default() -> Self {
        Self {
            page_size: 256,
            program_timeout_ms: 100,
            sector_erase_timeout_ms: 1000,
            block_erase_timeout_ms: 4000,
            chip_erase_timeout_ms: 200_000,
            progress_interval_ms: 500,
        }
    }
}

/// How the in-device memory address is sent to an EEPROM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum AddressMode {
    /// One byte up to 0xFF, two bytes (MSB first) above
    #[default]
    Auto,
    /// Always one byte (24C01..24C16)
    OneByte,
    /// Always two bytes (24C32 and larger)
    TwoByte,
}

impl AddressMode {
    /// Number of address bytes used for a transfer starting at `addr`
    pub const fn width_for(self, addr: u32) -> usize {
        match self {
            Self::Auto => {
                if addr > 0xFF {
                    2
                } else {
                    1
                }
            }
            Self::OneByte => 1,
            Self::TwoByte => 2,
        }
    }
}

/// I2C EEPROM geometry and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct EepromConfig {
    /// Write page size
    pub page_size: u32,
    /// Fixed settle delay after each page write
    pub write_cycle_ms: u32,
    /// Total device size, used by chip erase
    pub chip_size: u32,
    /// Memory address framing
    pub address_mode: AddressMode,
    /// Device address used at startup
    pub bus_address: BusAddress,
}

impl Default for EepromConfig {
    fn default() -> Self {
        Self {
            page_size: 8,
            write_cycle_ms: 5,
            chip_size: 32 * 1024,
            address_mode: AddressMode::Auto,
            bus_address: BusAddress::DEFAULT,
        }
    }
}
