//! Simulated serial NOR flash
//!
//! A W25Q-style part with a single status register. Program and erase set
//! WIP for a modelled duration; commands other than RDSR are ignored while
//! the part is busy, as on real silicon.

use crate::SimClock;
use alloc::vec;
use alloc::vec::Vec;
use uniprog_core::chip::SpiStatus;
use uniprog_core::error::{Error, Result};
use uniprog_core::poll::Clock;
use uniprog_core::programmer::SpiMaster;
use uniprog_core::spi::{opcodes, SpiCommand};

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Page program time
    pub program_busy_us: u64,
    /// 4 KiB sector erase time
    pub sector_erase_busy_us: u64,
    /// 64 KiB block erase time
    pub block_erase_busy_us: u64,
    /// Chip erase time
    pub chip_erase_busy_us: u64,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4017,     // W25Q64
            size: 8 * 1024 * 1024,
            page_size: 256,
            program_busy_us: 700,
            sector_erase_busy_us: 45_000,
            block_erase_busy_us: 150_000,
            chip_erase_busy_us: 2_000_000,
        }
    }
}

/// Dummy flash programmer
///
/// Emulates a serial NOR chip in memory for testing purposes.
pub struct DummySpiFlash {
    config: DummyConfig,
    clock: SimClock,
    data: Vec<u8>,
    status: SpiStatus,
    busy_until: u64,
    stuck_busy: bool,
}

impl DummySpiFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig, clock: SimClock) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            clock,
            data,
            status: SpiStatus::empty(),
            busy_until: 0,
            stuck_busy: false,
        }
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, clock: SimClock, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config, clock);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Set the block protection field (BP0..BP3)
    ///
    /// Program and erase are silently dropped while any BP bit is set.
    pub fn set_block_protect(&mut self, bp: u8) {
        let bits = (self.status.bits() & !0x3C) | ((bp & 0x0F) << 2);
        self.status = SpiStatus::from_raw(bits);
    }

    /// Keep WIP set forever
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    fn busy(&self) -> bool {
        self.stuck_busy || self.clock.now_us() < self.busy_until
    }

    fn status_byte(&self) -> u8 {
        let mut status = self.status;
        status.set(SpiStatus::BUSY, self.busy());
        status.bits()
    }

    fn start_write_cycle(&mut self, busy_us: u64) {
        self.status.remove(SpiStatus::WEL);
        self.busy_until = self.clock.now_us() + busy_us;
    }

    /// Whether a WEL-gated command may proceed; clears WEL either way
    fn take_write_enable(&mut self) -> bool {
        if !self.status.contains(SpiStatus::WEL) {
            log::warn!("dummy spi: write command without WREN ignored");
            return false;
        }
        if self.status.block_protect() != 0 {
            log::warn!("dummy spi: region protected, command ignored");
            self.status.remove(SpiStatus::WEL);
            return false;
        }
        true
    }

    fn offset(&self, addr: u32) -> usize {
        // addresses wrap at the end of the array
        addr as usize % self.data.len()
    }

    fn handle_read(&mut self, cmd: &mut SpiCommand<'_>) {
        let start = self.offset(cmd.address.unwrap_or(0));
        for (i, byte) in cmd.read_buf.iter_mut().enumerate() {
            *byte = self.data[(start + i) % self.data.len()];
        }
    }

    fn handle_page_program(&mut self, cmd: &SpiCommand<'_>) {
        if !self.take_write_enable() {
            return;
        }

        let addr = self.offset(cmd.address.unwrap_or(0));
        let page_size = self.config.page_size;
        let page_base = addr - addr % page_size;
        // Flash programming: can only change 1 -> 0, and wraps within the page
        for (i, &byte) in cmd.write_data.iter().enumerate() {
            let at = page_base + (addr % page_size + i) % page_size;
            self.data[at] &= byte;
        }

        self.start_write_cycle(self.config.program_busy_us);
    }

    fn handle_erase(&mut self, cmd: &SpiCommand<'_>, erase_size: usize, busy_us: u64) {
        if !self.take_write_enable() {
            return;
        }

        let addr = self.offset(cmd.address.unwrap_or(0));
        // Align address to erase boundary
        let aligned_addr = addr & !(erase_size - 1);
        let end = core::cmp::min(aligned_addr + erase_size, self.data.len());
        self.data[aligned_addr..end].fill(0xFF);

        self.start_write_cycle(busy_us);
    }

    fn handle_chip_erase(&mut self) {
        if !self.take_write_enable() {
            return;
        }
        self.data.fill(0xFF);
        self.start_write_cycle(self.config.chip_erase_busy_us);
    }
}

impl SpiMaster for DummySpiFlash {
    fn max_read_len(&self) -> usize {
        4096
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        if cmd.opcode == opcodes::RDSR {
            cmd.read_buf.fill(self.status_byte());
            return Ok(());
        }
        if self.busy() {
            log::trace!("dummy spi: opcode 0x{:02X} ignored while busy", cmd.opcode);
            cmd.read_buf.fill(0xFF);
            return Ok(());
        }

        match cmd.opcode {
            // JEDEC ID
            opcodes::RDID => {
                let id = [
                    self.config.manufacturer_id,
                    (self.config.device_id >> 8) as u8,
                    self.config.device_id as u8,
                ];
                for (dst, src) in cmd.read_buf.iter_mut().zip(id) {
                    *dst = src;
                }
            }

            // Write enable/disable
            opcodes::WREN => self.status.insert(SpiStatus::WEL),
            opcodes::WRDI => self.status.remove(SpiStatus::WEL),

            // Read commands
            opcodes::READ | opcodes::FAST_READ => self.handle_read(cmd),

            // Page program
            opcodes::PP => self.handle_page_program(cmd),

            // Erase commands
            opcodes::SE_20 => {
                self.handle_erase(cmd, opcodes::SECTOR_SIZE as usize, self.config.sector_erase_busy_us)
            }
            opcodes::BE_D8 => {
                self.handle_erase(cmd, opcodes::BLOCK_SIZE as usize, self.config.block_erase_busy_us)
            }
            opcodes::CE_60 | opcodes::CE_C7 => self.handle_chip_erase(),

            // Unknown opcode
            _ => return Err(Error::InvalidInput),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uniprog_core::chip::{Identity, JedecId, Status};
    use uniprog_core::config::SpiNorConfig;
    use uniprog_core::engine::{EraseKind, MemoryEngine, SpiNorEngine};
    use uniprog_core::poll::{NoProgress, Progress};
    use uniprog_core::protocol::spi25;

    fn setup() -> SpiNorEngine<DummySpiFlash, SimClock> {
        let clock = SimClock::new();
        let flash = DummySpiFlash::new(DummyConfig::default(), clock.clone());
        SpiNorEngine::new(flash, clock, SpiNorConfig::default())
    }

    #[test]
    fn test_read_jedec_id() {
        let clock = SimClock::new();
        let mut flash = DummySpiFlash::new(DummyConfig::default(), clock);
        let (mfr, dev) = spi25::read_jedec_id(&mut flash).unwrap();
        assert_eq!(mfr, 0xEF);
        assert_eq!(dev, 0x4017);
    }

    #[test]
    fn test_program_without_wren_is_ignored() {
        let clock = SimClock::new();
        let mut flash = DummySpiFlash::new(DummyConfig::default(), clock);

        let mut cmd = SpiCommand::write_3b(opcodes::PP, 0x1000, &[0x00]);
        flash.execute(&mut cmd).unwrap();

        assert_eq!(flash.data()[0x1000], 0xFF);
    }

    #[test]
    fn test_write_across_page_then_read() {
        let mut spi = setup();
        let data: Vec<u8> = (0..300u32).map(|i| i as u8).collect();

        spi.write_data(0x80, &data).unwrap();

        let mut buf = vec![0u8; 300];
        spi.read_data(0x80, &mut buf).unwrap();
        assert_eq!(buf, data);
        assert_eq!(spi.master().data()[0x7F], 0xFF);
        assert_eq!(spi.master().data()[0x80 + 300], 0xFF);
    }

    #[test]
    fn test_erase_sector_and_block() {
        let mut spi = setup();
        spi.master_mut().data_mut()[..0x20000].fill(0x00);

        spi.erase(EraseKind::Sector, 0x1234, &mut NoProgress).unwrap();
        assert!(spi.master().data()[0x1000..0x2000].iter().all(|&b| b == 0xFF));
        assert_eq!(spi.master().data()[0x0FFF], 0x00);
        assert_eq!(spi.master().data()[0x2000], 0x00);

        spi.erase(EraseKind::Block, 0x10000, &mut NoProgress).unwrap();
        assert!(spi.master().data()[0x10000..0x20000].iter().all(|&b| b == 0xFF));
    }

    struct Count {
        waiting: usize,
    }

    impl Progress for Count {
        fn waiting(&mut self, _elapsed_ms: u32) {
            self.waiting += 1;
        }
        fn step(&mut self, _done: usize, _total: usize) {}
    }

    #[test]
    fn test_chip_erase_reports_progress() {
        let mut spi = setup();
        spi.master_mut().data_mut()[0x500000] = 0x00;
        let mut progress = Count { waiting: 0 };

        spi.erase(EraseKind::Chip, 0, &mut progress).unwrap();

        assert_eq!(spi.master().data()[0x500000], 0xFF);
        // 2 s erase, reported every 500 ms
        assert!(progress.waiting >= 3);
    }

    #[test]
    fn test_protected_part_keeps_data() {
        let mut spi = setup();
        spi.master_mut().set_block_protect(0b0011);

        spi.write_data(0, &[0x00]).unwrap();

        assert_eq!(spi.master().data()[0], 0xFF);
        let Status::SpiNor(status) = spi.read_status().unwrap() else {
            panic!("wrong status kind");
        };
        assert_eq!(status.block_protect(), 0b0011);
        assert!(!status.contains(SpiStatus::WEL));
    }

    #[test]
    fn test_stuck_busy_erase_times_out() {
        let mut spi = setup();
        spi.master_mut().set_stuck_busy(true);

        assert_eq!(
            spi.erase(EraseKind::Sector, 0, &mut NoProgress),
            Err(Error::Timeout)
        );
    }

    #[test]
    fn test_identify() {
        let mut spi = setup();
        assert_eq!(
            spi.identify().unwrap(),
            Identity::SpiNor(JedecId {
                manufacturer: 0xEF,
                device: 0x4017
            })
        );
    }
}
