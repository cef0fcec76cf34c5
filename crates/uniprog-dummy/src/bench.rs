//! A complete simulated bench: one chip of each technology on a shared clock

use crate::{
    DummyConfig, DummyEeprom, DummyI2cBus, DummyNand, DummySpiFlash, EepromModel, NandModel,
    SimClock,
};
use uniprog_core::config::{AddressMode, EepromConfig, NandConfig, SpiNorConfig};
use uniprog_core::engine::{EepromEngine, NandEngine, SpiNorEngine};
use uniprog_core::Session;

/// Simulated chips wired up to match a set of engine configurations
pub struct Bench {
    /// Shared timeline
    pub clock: SimClock,
    /// NAND chip
    pub nand: DummyNand,
    /// Serial NOR chip
    pub spi: DummySpiFlash,
    /// I2C bus with one EEPROM at the configured address
    pub i2c: DummyI2cBus,
    /// NAND engine settings
    pub nand_config: NandConfig,
    /// Serial NOR engine settings
    pub spi_config: SpiNorConfig,
    /// EEPROM engine settings, with `Auto` addressing resolved
    pub eeprom_config: EepromConfig,
}

impl Bench {
    /// Build chips whose geometry follows the given configurations
    pub fn new(
        nand_config: NandConfig,
        spi_config: SpiNorConfig,
        mut eeprom_config: EepromConfig,
    ) -> Self {
        let clock = SimClock::new();

        let nand = DummyNand::new(NandModel::from_config(&nand_config), clock.clone());

        let spi = DummySpiFlash::new(
            DummyConfig {
                page_size: spi_config.page_size as usize,
                ..DummyConfig::default()
            },
            clock.clone(),
        );

        let model = EepromModel::from_config(&eeprom_config);
        if eeprom_config.address_mode == AddressMode::Auto {
            // a simulated part has a fixed pointer width
            eeprom_config.address_mode = if model.address_bytes == 2 {
                AddressMode::TwoByte
            } else {
                AddressMode::OneByte
            };
            log::debug!("sim: EEPROM uses {}-byte addressing", model.address_bytes);
        }
        let mut i2c = DummyI2cBus::new(clock.clone());
        i2c.attach(eeprom_config.bus_address, DummyEeprom::new(model));

        Self {
            clock,
            nand,
            spi,
            i2c,
            nand_config,
            spi_config,
            eeprom_config,
        }
    }

    /// Wrap the chips in engines and hand them to a session
    pub fn into_session(self) -> Session<DummyNand, DummySpiFlash, DummyI2cBus, SimClock> {
        Session::new(
            NandEngine::new(self.nand, self.clock.clone(), self.nand_config),
            SpiNorEngine::new(self.spi, self.clock.clone(), self.spi_config),
            EepromEngine::new(self.i2c, self.clock, self.eeprom_config),
        )
    }
}

impl Default for Bench {
    fn default() -> Self {
        Self::new(
            NandConfig::default(),
            SpiNorConfig::default(),
            EepromConfig::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use uniprog_core::config::BusAddress;
    use uniprog_core::engine::{EraseKind, Technology};
    use uniprog_core::hexdump::format_hex_dump;
    use uniprog_core::poll::NoProgress;
    use uniprog_core::Error;

    #[test]
    fn test_nothing_selected() {
        let mut session = Bench::default().into_session();
        assert!(matches!(session.engine(), Err(Error::DeviceNotSelected)));
    }

    #[test]
    fn test_every_technology_round_trips() {
        let mut session = Bench::default().into_session();
        for tech in Technology::ALL {
            session.select(tech).unwrap();
            let engine = session.engine().unwrap();

            engine.write_data(0x40, &[0x12, 0x34, 0x56]).unwrap();
            let mut buf = [0u8; 3];
            engine.read_data(0x40, &mut buf).unwrap();

            assert_eq!(buf, [0x12, 0x34, 0x56], "{}", tech);
        }
    }

    #[test]
    fn test_eeprom_detect_reports_default_device() {
        let mut session = Bench::default().into_session();
        session.select(Technology::AddressedEeprom).unwrap();

        let identity = session.engine().unwrap().identify().unwrap();

        assert_eq!(
            format!("{}", identity),
            "Device found at address 0x50 (likely EEPROM)"
        );
    }

    #[test]
    fn test_changing_bus_address_loses_device() {
        let mut session = Bench::default().into_session();
        session.set_bus_address(BusAddress::new(0x51).unwrap());
        session.select(Technology::AddressedEeprom).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(
            session.engine().unwrap().read_data(0, &mut buf),
            Err(Error::BusNotResponding)
        );
    }

    #[test]
    fn test_erased_nor_dump() {
        let mut session = Bench::default().into_session();
        session.select(Technology::SerialNor).unwrap();
        let engine = session.engine().unwrap();
        engine.write_data(0x1000, b"uniprog").unwrap();
        engine.erase(EraseKind::Sector, 0x1000, &mut NoProgress).unwrap();

        let mut buf = [0u8; 16];
        engine.read_data(0x1000, &mut buf).unwrap();

        assert_eq!(
            format_hex_dump(&buf, 0x1000),
            "0x1000: FF FF FF FF FF FF FF FF FF FF FF FF FF FF FF FF  | ................\n"
        );
    }

    #[test]
    fn test_nand_status_after_select() {
        let mut session = Bench::default().into_session();
        session.select(Technology::Nand).unwrap();

        let status = session.engine().unwrap().read_status().unwrap();

        assert_eq!(
            format!("{}", status),
            "Status: 0x40\nProgram/Erase Failed: No\nReady/Busy: Ready\nWrite Protected: No"
        );
    }
}
