//! Simulated I2C bus with 24Cxx EEPROMs attached
//!
//! Devices NACK their address for the duration of the internal write cycle
//! and wrap page writes within the current page.

use crate::SimClock;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use uniprog_core::config::{AddressMode, BusAddress, EepromConfig};
use uniprog_core::error::{Error, Result};
use uniprog_core::poll::Clock;
use uniprog_core::programmer::I2cBus;

/// Geometry and timing of a simulated EEPROM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromModel {
    /// Capacity in bytes
    pub size: usize,
    /// Write page size
    pub page_size: usize,
    /// Memory address bytes expected after the device address
    pub address_bytes: usize,
    /// Internal write cycle (tWR)
    pub write_cycle_us: u64,
}

impl EepromModel {
    /// 2 Kbit, 8-byte pages, one address byte
    pub const AT24C02: Self = Self {
        size: 256,
        page_size: 8,
        address_bytes: 1,
        write_cycle_us: 5000,
    };

    /// 256 Kbit, 64-byte pages, two address bytes
    pub const AT24C256: Self = Self {
        size: 32 * 1024,
        page_size: 64,
        address_bytes: 2,
        write_cycle_us: 5000,
    };

    /// Model matching an engine configuration
    ///
    /// `Auto` addressing is resolved by capacity: parts above 256 bytes take
    /// two address bytes.
    pub fn from_config(config: &EepromConfig) -> Self {
        let address_bytes = match config.address_mode {
            AddressMode::OneByte => 1,
            AddressMode::TwoByte => 2,
            AddressMode::Auto if config.chip_size > 0x100 => 2,
            AddressMode::Auto => 1,
        };
        Self {
            size: config.chip_size.max(1) as usize,
            page_size: config.page_size.max(1) as usize,
            address_bytes,
            write_cycle_us: config.write_cycle_ms as u64 * 1000,
        }
    }
}

/// One simulated EEPROM
#[derive(Debug, Clone)]
pub struct DummyEeprom {
    model: EepromModel,
    data: Vec<u8>,
    pointer: usize,
    busy_until: u64,
}

impl DummyEeprom {
    /// Create an erased (all 0xFF) device
    pub fn new(model: EepromModel) -> Self {
        Self {
            data: vec![0xFF; model.size],
            model,
            pointer: 0,
            busy_until: 0,
        }
    }

    /// Device geometry
    pub fn model(&self) -> &EepromModel {
        &self.model
    }

    /// Memory contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable memory contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn acks(&self, now: u64) -> bool {
        now >= self.busy_until
    }

    fn write(&mut self, now: u64, bytes: &[u8]) {
        let width = self.model.address_bytes;
        if bytes.len() < width {
            // partial pointer: acknowledged, nothing latched
            return;
        }
        let (addr, payload) = bytes.split_at(width);
        let pointer = addr.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
        self.pointer = pointer % self.data.len();
        if payload.is_empty() {
            return;
        }

        let page = self.model.page_size;
        let base = self.pointer - self.pointer % page;
        let mut offset = self.pointer % page;
        for &b in payload {
            let at = base + offset;
            if at < self.data.len() {
                self.data[at] = b;
            }
            offset = (offset + 1) % page;
        }
        self.busy_until = now + self.model.write_cycle_us;
        log::trace!(
            "dummy eeprom: {} bytes at 0x{:04X}",
            payload.len(),
            self.pointer
        );
    }

    fn read(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.data[self.pointer];
            self.pointer = (self.pointer + 1) % self.data.len();
        }
    }
}

/// I2C bus with any number of simulated EEPROMs
pub struct DummyI2cBus {
    clock: SimClock,
    devices: BTreeMap<u8, DummyEeprom>,
}

impl DummyI2cBus {
    /// Empty bus
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            devices: BTreeMap::new(),
        }
    }

    /// Attach a device at `addr`, replacing anything already there
    pub fn attach(&mut self, addr: BusAddress, device: DummyEeprom) {
        self.devices.insert(addr.get(), device);
    }

    /// Remove the device at `addr`
    pub fn detach(&mut self, addr: BusAddress) -> Option<DummyEeprom> {
        self.devices.remove(&addr.get())
    }

    /// Device at `addr`
    pub fn device(&self, addr: BusAddress) -> Option<&DummyEeprom> {
        self.devices.get(&addr.get())
    }

    /// Mutable device at `addr`
    pub fn device_mut(&mut self, addr: BusAddress) -> Option<&mut DummyEeprom> {
        self.devices.get_mut(&addr.get())
    }

    fn responding(&mut self, addr: BusAddress) -> Option<&mut DummyEeprom> {
        let now = self.clock.now_us();
        self.devices.get_mut(&addr.get()).filter(|d| d.acks(now))
    }
}

impl I2cBus for DummyI2cBus {
    fn probe(&mut self, addr: BusAddress) -> Result<bool> {
        Ok(self.responding(addr).is_some())
    }

    fn write(&mut self, addr: BusAddress, bytes: &[u8]) -> Result<()> {
        let now = self.clock.now_us();
        match self.responding(addr) {
            Some(device) => {
                device.write(now, bytes);
                Ok(())
            }
            None => Err(Error::BusNotResponding),
        }
    }

    fn read(&mut self, addr: BusAddress, buf: &mut [u8]) -> Result<usize> {
        match self.responding(addr) {
            Some(device) => {
                device.read(buf);
                Ok(buf.len())
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uniprog_core::chip::{EepromStatus, Identity, Status};
    use uniprog_core::engine::{EepromEngine, EraseKind, MemoryEngine};
    use uniprog_core::poll::NoProgress;

    fn setup(model: EepromModel, config: EepromConfig) -> EepromEngine<DummyI2cBus, SimClock> {
        let clock = SimClock::new();
        let mut bus = DummyI2cBus::new(clock.clone());
        bus.attach(BusAddress::DEFAULT, DummyEeprom::new(model));
        EepromEngine::new(bus, clock, config)
    }

    fn small() -> EepromEngine<DummyI2cBus, SimClock> {
        let config = EepromConfig {
            chip_size: 256,
            ..EepromConfig::default()
        };
        setup(EepromModel::AT24C02, config)
    }

    fn large() -> EepromEngine<DummyI2cBus, SimClock> {
        let config = EepromConfig {
            address_mode: AddressMode::TwoByte,
            ..EepromConfig::default()
        };
        setup(EepromModel::AT24C256, config)
    }

    #[test]
    fn test_one_byte_part_round_trip() {
        let mut eeprom = small();
        let data: Vec<u8> = (0..20).collect();

        eeprom.write_data(5, &data).unwrap();

        let mut buf = [0u8; 20];
        eeprom.read_data(5, &mut buf).unwrap();
        assert_eq!(&buf[..], &data[..]);
    }

    #[test]
    fn test_two_byte_part_round_trip() {
        let mut eeprom = large();

        eeprom.write_data(0x1234, b"hello").unwrap();

        let mut buf = [0u8; 5];
        eeprom.read_data(0x1234, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        let device = eeprom.bus().device(BusAddress::DEFAULT).unwrap();
        assert_eq!(&device.data()[0x1234..0x1239], b"hello");
    }

    #[test]
    fn test_device_naks_during_write_cycle() {
        let clock = SimClock::new();
        let mut bus = DummyI2cBus::new(clock.clone());
        bus.attach(BusAddress::DEFAULT, DummyEeprom::new(EepromModel::AT24C02));

        bus.write(BusAddress::DEFAULT, &[0x00, 0xAA]).unwrap();
        assert!(!bus.probe(BusAddress::DEFAULT).unwrap());
        assert_eq!(
            bus.write(BusAddress::DEFAULT, &[0x01, 0xBB]),
            Err(Error::BusNotResponding)
        );

        clock.delay_ms(5);
        assert!(bus.probe(BusAddress::DEFAULT).unwrap());
    }

    #[test]
    fn test_page_write_wraps_within_page() {
        let clock = SimClock::new();
        let mut bus = DummyI2cBus::new(clock);
        bus.attach(BusAddress::DEFAULT, DummyEeprom::new(EepromModel::AT24C02));

        bus.write(BusAddress::DEFAULT, &[0x06, 1, 2, 3]).unwrap();

        let data = bus.device(BusAddress::DEFAULT).unwrap().data();
        assert_eq!(&data[..8], &[3, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 1, 2]);
    }

    #[test]
    fn test_block_erase_fills_ff() {
        let mut eeprom = large();
        eeprom
            .bus_mut()
            .device_mut(BusAddress::DEFAULT)
            .unwrap()
            .data_mut()
            .fill(0x00);

        eeprom.erase(EraseKind::Block, 0x1000, &mut NoProgress).unwrap();

        let data = eeprom.bus().device(BusAddress::DEFAULT).unwrap().data();
        assert!(data[0x1000..0x2000].iter().all(|&b| b == 0xFF));
        assert_eq!(data[0x0FFF], 0x00);
        assert_eq!(data[0x2000], 0x00);
    }

    #[test]
    fn test_scan_and_status() {
        let mut eeprom = small();
        let second = BusAddress::new(0x68).unwrap();
        eeprom
            .bus_mut()
            .attach(second, DummyEeprom::new(EepromModel::AT24C02));

        let Identity::Eeprom(scan) = eeprom.identify().unwrap() else {
            panic!("wrong identity kind");
        };
        assert_eq!(&scan.found[..], &[BusAddress::DEFAULT, second]);

        eeprom.bus_mut().detach(BusAddress::DEFAULT);
        assert_eq!(
            eeprom.read_status().unwrap(),
            Status::Eeprom(EepromStatus {
                present: false,
                ready: false
            })
        );
    }
}
