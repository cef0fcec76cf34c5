//! Memory session
//!
//! Tracks which technology is active and routes operations to the matching
//! engine. Nothing is selected at start-up; every operation fails with
//! [`Error::DeviceNotSelected`] until [`Session::select`] succeeds.

use crate::config::BusAddress;
use crate::engine::{EepromEngine, MemoryEngine, NandEngine, SpiNorEngine, Technology};
use crate::error::{Error, Result};
use crate::poll::Clock;
use crate::programmer::{I2cBus, ParallelBus, SpiMaster};

/// Active-technology state plus the three engines
pub struct Session<P, M, B, C> {
    nand: NandEngine<P, C>,
    spi: SpiNorEngine<M, C>,
    eeprom: EepromEngine<B, C>,
    active: Option<Technology>,
}

impl<P, M, B, C> Session<P, M, B, C>
where
    P: ParallelBus,
    M: SpiMaster,
    B: I2cBus,
    C: Clock,
{
    /// Build a session with no technology selected
    pub fn new(nand: NandEngine<P, C>, spi: SpiNorEngine<M, C>, eeprom: EepromEngine<B, C>) -> Self {
        Self {
            nand,
            spi,
            eeprom,
            active: None,
        }
    }

    /// Make `tech` the active technology and run its selection hook
    ///
    /// The selection sticks even if the hook fails, so the user can retry
    /// operations against the newly chosen device.
    pub fn select(&mut self, tech: Technology) -> Result<()> {
        log::info!("Selected {}", tech);
        self.active = Some(tech);
        self.engine()?.on_select()
    }

    /// Currently active technology
    pub fn active(&self) -> Option<Technology> {
        self.active
    }

    /// Engine for the active technology
    pub fn engine(&mut self) -> Result<&mut dyn MemoryEngine> {
        match self.active {
            Some(Technology::Nand) => Ok(&mut self.nand),
            Some(Technology::SerialNor) => Ok(&mut self.spi),
            Some(Technology::AddressedEeprom) => Ok(&mut self.eeprom),
            None => Err(Error::DeviceNotSelected),
        }
    }

    /// Device address used by EEPROM operations
    pub fn bus_address(&self) -> BusAddress {
        self.eeprom.bus_address()
    }

    /// Change the EEPROM device address; valid whatever is selected
    pub fn set_bus_address(&mut self, addr: BusAddress) {
        self.eeprom.set_bus_address(addr);
    }

    /// NAND engine
    pub fn nand(&mut self) -> &mut NandEngine<P, C> {
        &mut self.nand
    }

    /// SPI NOR engine
    pub fn spi(&mut self) -> &mut SpiNorEngine<M, C> {
        &mut self.spi
    }

    /// EEPROM engine
    pub fn eeprom(&mut self) -> &mut EepromEngine<B, C> {
        &mut self.eeprom
    }
}
