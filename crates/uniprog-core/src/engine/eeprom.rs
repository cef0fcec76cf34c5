//! I2C EEPROM engine
//!
//! 24Cxx-style parts have no ID register, no erase command and no status
//! register. Identify scans the bus, erase fills with 0xFF, and status is
//! derived from acknowledgement probes. Writes wait a fixed write-cycle time
//! after each page instead of ACK polling.

use super::{EraseKind, MemoryEngine, Technology};
use crate::chip::{BusScan, EepromStatus, Identity, Status};
use crate::config::{BusAddress, EepromConfig};
use crate::error::{Error, Result};
use crate::poll::{Clock, Progress};
use crate::programmer::I2cBus;
use crate::protocol::i2c_eeprom::{self, MAX_PAGE_SIZE};

/// Bytes fetched per read transaction
pub const READ_CHUNK: usize = 16;
/// Bytes filled by a sector erase
pub const SECTOR_FILL: u32 = 256;
/// Bytes filled by a block erase
pub const BLOCK_FILL: u32 = 4096;

/// Highest address reachable with two address bytes, plus one
const ADDRESS_SPACE: u64 = 0x1_0000;

/// I2C EEPROM protocol engine
pub struct EepromEngine<B, C> {
    bus: B,
    clock: C,
    config: EepromConfig,
    device: BusAddress,
}

impl<B: I2cBus, C: Clock> EepromEngine<B, C> {
    /// Create an engine talking to `config.bus_address`
    pub fn new(bus: B, clock: C, config: EepromConfig) -> Self {
        Self {
            bus,
            clock,
            device: config.bus_address,
            config,
        }
    }

    /// Geometry and timing in use
    pub fn config(&self) -> &EepromConfig {
        &self.config
    }

    /// Device address operations are sent to
    pub fn bus_address(&self) -> BusAddress {
        self.device
    }

    /// Change the device address
    pub fn set_bus_address(&mut self, addr: BusAddress) {
        log::debug!("eeprom: device address set to {}", addr);
        self.device = addr;
    }

    /// Access the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable access to the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Probe every valid address and collect the ones that acknowledge
    pub fn scan(&mut self) -> Result<BusScan> {
        let mut scan = BusScan::default();
        for addr in BusAddress::all() {
            if self.bus.probe(addr)? {
                log::debug!("eeprom: device at {}", addr);
                // capacity covers every valid address
                let _ = scan.found.push(addr);
            }
        }
        Ok(scan)
    }

    fn ensure_present(&mut self) -> Result<()> {
        if self.bus.probe(self.device)? {
            Ok(())
        } else {
            log::warn!("eeprom: device at {} not responding", self.device);
            Err(Error::BusNotResponding)
        }
    }

    fn check_range(addr: u32, len: usize) -> Result<()> {
        if addr as u64 + len as u64 > ADDRESS_SPACE {
            return Err(Error::InvalidAddressOrLength);
        }
        Ok(())
    }

    fn page_size(&self) -> Result<usize> {
        let page = self.config.page_size as usize;
        if page == 0 || page > MAX_PAGE_SIZE {
            return Err(Error::InvalidInput);
        }
        Ok(page)
    }

    /// Page-split write without the presence probe
    ///
    /// The address width is chosen once from the start address.
    fn program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let page = self.page_size()?;
        let width = self.config.address_mode.width_for(addr);
        let mut written = 0usize;
        while written < data.len() {
            let cur = addr + written as u32;
            let n = core::cmp::min(page - cur as usize % page, data.len() - written);
            i2c_eeprom::write_at(
                &mut self.bus,
                self.device,
                cur,
                width,
                &data[written..written + n],
            )?;
            self.clock.delay_ms(self.config.write_cycle_ms);
            written += n;
        }
        Ok(())
    }

    fn fill(&mut self, start: u32, len: u32, progress: &mut dyn Progress) -> Result<()> {
        Self::check_range(start, len as usize)?;
        let page = self.page_size()?;
        self.ensure_present()?;

        let ones = [0xFFu8; MAX_PAGE_SIZE];
        let total = len as usize;
        let mut done = 0usize;
        while done < total {
            let n = core::cmp::min(page, total - done);
            self.program(start + done as u32, &ones[..n])?;
            done += n;
            progress.step(done, total);
        }
        Ok(())
    }
}

impl<B: I2cBus, C: Clock> MemoryEngine for EepromEngine<B, C> {
    fn technology(&self) -> Technology {
        Technology::AddressedEeprom
    }

    fn identify(&mut self) -> Result<Identity> {
        Ok(Identity::Eeprom(self.scan()?))
    }

    fn read_data(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        Self::check_range(addr, buf.len())?;
        self.ensure_present()?;

        let width = self.config.address_mode.width_for(addr);
        for (i, chunk) in buf.chunks_mut(READ_CHUNK).enumerate() {
            let cur = addr + (i * READ_CHUNK) as u32;
            i2c_eeprom::read_at(&mut self.bus, self.device, cur, width, chunk)?;
        }
        Ok(())
    }

    fn write_data(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidAddressOrLength);
        }
        Self::check_range(addr, data.len())?;
        self.ensure_present()?;
        self.program(addr, data)
    }

    fn erase(&mut self, kind: EraseKind, addr: u32, progress: &mut dyn Progress) -> Result<()> {
        match kind {
            EraseKind::Sector => self.fill(addr, SECTOR_FILL, progress),
            EraseKind::Block => self.fill(addr, BLOCK_FILL, progress),
            EraseKind::Chip => self.fill(0, self.config.chip_size, progress),
        }
    }

    fn read_status(&mut self) -> Result<Status> {
        let present = self.bus.probe(self.device)?;
        let ready = present && i2c_eeprom::is_ready(&mut self.bus, self.device)?;
        Ok(Status::Eeprom(EepromStatus { present, ready }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AddressMode;
    use crate::poll::NoProgress;
    use crate::testing::{RecordingI2c, TestClock};
    use std::format;
    use std::vec;
    use std::vec::Vec;

    fn engine(bus: RecordingI2c) -> EepromEngine<RecordingI2c, TestClock> {
        EepromEngine::new(bus, TestClock::new(), EepromConfig::default())
    }

    #[test]
    fn test_write_10_bytes_at_offset_5_splits_3_then_7() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[0x50]));
        let data: Vec<u8> = (1..=10).collect();

        eeprom.write_data(5, &data).unwrap();

        let writes = &eeprom.bus().writes;
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], (0x50, vec![0x05, 1, 2, 3]));
        assert_eq!(writes[1], (0x50, vec![0x08, 4, 5, 6, 7, 8, 9, 10]));
        // one settle delay per sub-write
        assert_eq!(eeprom.clock.now_us(), 10_000);
    }

    #[test]
    fn test_two_byte_pointer_above_0xff() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[0x50]));

        eeprom.write_data(0x1234, &[0xAA]).unwrap();

        assert_eq!(eeprom.bus().writes[0].1, vec![0x12, 0x34, 0xAA]);
    }

    #[test]
    fn test_forced_two_byte_mode() {
        let config = EepromConfig {
            address_mode: AddressMode::TwoByte,
            ..EepromConfig::default()
        };
        let mut eeprom = EepromEngine::new(
            RecordingI2c::with_devices(&[0x50]),
            TestClock::new(),
            config,
        );

        eeprom.write_data(0x10, &[0xAA]).unwrap();

        assert_eq!(eeprom.bus().writes[0].1, vec![0x00, 0x10, 0xAA]);
    }

    #[test]
    fn test_read_in_16_byte_chunks() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[0x50]));
        let mut buf = [0u8; 40];

        eeprom.read_data(0x20, &mut buf).unwrap();

        let bus = eeprom.bus();
        let pointers: Vec<Vec<u8>> = bus.writes.iter().map(|(_, w)| w.clone()).collect();
        assert_eq!(pointers, vec![vec![0x20], vec![0x30], vec![0x40]]);
        assert_eq!(bus.reads, vec![(0x50, 16), (0x50, 16), (0x50, 8)]);
        assert!(buf.iter().all(|&b| b == 0xA5));
    }

    #[test]
    fn test_short_read_is_transfer_failure() {
        let mut bus = RecordingI2c::with_devices(&[0x50]);
        bus.read_limit = Some(4);
        let mut eeprom = engine(bus);
        let mut buf = [0u8; 16];

        assert_eq!(eeprom.read_data(0, &mut buf), Err(Error::TransferFailed));
    }

    #[test]
    fn test_absent_device_not_responding() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[]));
        let mut buf = [0u8; 4];

        assert_eq!(eeprom.read_data(0, &mut buf), Err(Error::BusNotResponding));
        assert_eq!(eeprom.write_data(0, &[1]), Err(Error::BusNotResponding));
        assert!(eeprom.bus().writes.is_empty());
    }

    #[test]
    fn test_detect_single_device() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[0x50]));

        let identity = eeprom.identify().unwrap();

        let Identity::Eeprom(scan) = &identity else {
            panic!("unexpected identity {:?}", identity);
        };
        assert_eq!(scan.found.len(), 1);
        assert_eq!(scan.found[0].get(), 0x50);
        assert_eq!(
            format!("{}", identity),
            "Device found at address 0x50 (likely EEPROM)"
        );
        assert_eq!(eeprom.bus().probes.len(), 0x70);
        assert_eq!(eeprom.bus().probes.first(), Some(&0x08));
        assert_eq!(eeprom.bus().probes.last(), Some(&0x77));
    }

    #[test]
    fn test_empty_scan_is_not_an_error() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[]));
        let identity = eeprom.identify().unwrap();
        assert_eq!(format!("{}", identity), "No I2C devices found!");
    }

    #[test]
    fn test_sector_erase_fills_256_bytes() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[0x50]));

        eeprom.erase(EraseKind::Sector, 0x100, &mut NoProgress).unwrap();

        let writes = &eeprom.bus().writes;
        assert_eq!(writes.len(), 32);
        assert_eq!(writes[0].1[..2], [0x01, 0x00]);
        assert!(writes.iter().all(|(_, w)| w[2..].iter().all(|&b| b == 0xFF)));
    }

    #[test]
    fn test_status_uses_probes() {
        let mut eeprom = engine(RecordingI2c::with_devices(&[0x50]));
        assert_eq!(
            eeprom.read_status().unwrap(),
            Status::Eeprom(EepromStatus {
                present: true,
                ready: true
            })
        );

        eeprom.set_bus_address(BusAddress::new(0x51).unwrap());
        assert_eq!(
            eeprom.read_status().unwrap(),
            Status::Eeprom(EepromStatus {
                present: false,
                ready: false
            })
        );
    }

    #[test]
    fn test_status_present_but_busy() {
        let mut bus = RecordingI2c::with_devices(&[0x50]);
        bus.busy = true;
        let mut eeprom = engine(bus);

        assert_eq!(
            eeprom.read_status().unwrap(),
            Status::Eeprom(EepromStatus {
                present: true,
                ready: false
            })
        );
        assert_eq!(eeprom.bus().probes, vec![0x50]);
        assert!(eeprom.bus().writes.is_empty());
    }
}
