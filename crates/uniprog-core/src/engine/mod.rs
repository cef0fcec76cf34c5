//! Protocol engines
//!
//! One engine per memory technology. Each owns its transport and a clock
//! and implements [`MemoryEngine`], the uniform operation vocabulary the
//! session and dispatcher work with.

mod eeprom;
mod nand;
mod spi_nor;

pub use eeprom::EepromEngine;
pub use nand::NandEngine;
pub use spi_nor::SpiNorEngine;

use crate::chip::{Identity, Status};
use crate::error::Result;
use crate::poll::Progress;
use core::fmt;

/// Memory technology handled by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technology {
    /// Parallel NAND flash
    Nand,
    /// Serial (SPI) NOR flash
    SerialNor,
    /// Addressed-bus (I2C) EEPROM
    AddressedEeprom,
}

impl Technology {
    /// All technologies in menu order
    pub const ALL: [Technology; 3] = [Self::Nand, Self::SerialNor, Self::AddressedEeprom];

    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Nand => "NAND Flash",
            Self::SerialNor => "SPI Flash",
            Self::AddressedEeprom => "I2C EEPROM",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Erase granularity requested by the user
///
/// What each kind covers is technology specific: NAND erases the containing
/// block for both `Sector` and `Block`, NOR uses 4 KiB / 64 KiB erases and
/// EEPROMs fill 256 B / 4 KiB with 0xFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EraseKind {
    /// Smallest erase unit
    Sector,
    /// Large erase unit
    Block,
    /// Whole device
    Chip,
}

impl fmt::Display for EraseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sector => "sector",
            Self::Block => "block",
            Self::Chip => "chip",
        })
    }
}

/// Uniform operation set implemented by every protocol engine
///
/// Every call runs to completion (or failure) before returning.
pub trait MemoryEngine {
    /// Which technology this engine drives
    fn technology(&self) -> Technology;

    /// Hook run when the technology becomes active
    fn on_select(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read the device identity
    fn identify(&mut self) -> Result<Identity>;

    /// Fill `buf` with data starting at `addr`
    fn read_data(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `addr`
    fn write_data(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase the region of `kind` containing `addr` (ignored for chip erase)
    fn erase(&mut self, kind: EraseKind, addr: u32, progress: &mut dyn Progress) -> Result<()>;

    /// Read the device status
    fn read_status(&mut self) -> Result<Status>;
}
