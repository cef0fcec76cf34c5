//! Serial NOR flash engine

use super::{EraseKind, MemoryEngine, Technology};
use crate::chip::{Identity, JedecId, SpiStatus, Status};
use crate::config::SpiNorConfig;
use crate::error::{Error, Result};
use crate::poll::{Clock, PollPolicy, Progress};
use crate::programmer::SpiMaster;
use crate::protocol::spi25;
use crate::spi::{opcodes, AddressWidth};

// Status polling intervals per operation (typical program 0.7-5ms,
// 4KB erase 45-400ms, 64KB erase 150-2000ms)
const PROGRAM_POLL_US: u32 = 10;
const SECTOR_POLL_US: u32 = 10_000;
const BLOCK_POLL_US: u32 = 100_000;
const CHIP_POLL_US: u32 = 100_000;

/// Serial NOR (SPI25) protocol engine
pub struct SpiNorEngine<M, C> {
    master: M,
    clock: C,
    config: SpiNorConfig,
}

impl<M: SpiMaster, C: Clock> SpiNorEngine<M, C> {
    /// Create an engine over `master`
    pub fn new(master: M, clock: C, config: SpiNorConfig) -> Self {
        Self {
            master,
            clock,
            config,
        }
    }

    /// Geometry and timing in use
    pub fn config(&self) -> &SpiNorConfig {
        &self.config
    }

    /// Access the underlying master
    pub fn master(&self) -> &M {
        &self.master
    }

    /// Mutable access to the underlying master
    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    fn erase_policy(&self, timeout_ms: u32, interval_us: u32) -> PollPolicy {
        PollPolicy::with_timeout_ms(timeout_ms)
            .interval_us(interval_us)
            .progress_every_ms(self.config.progress_interval_ms)
    }
}

impl<M: SpiMaster, C: Clock> MemoryEngine for SpiNorEngine<M, C> {
    fn technology(&self) -> Technology {
        Technology::SerialNor
    }

    fn identify(&mut self) -> Result<Identity> {
        let (manufacturer, device) = spi25::read_jedec_id(&mut self.master)?;
        log::debug!("spi: JEDEC ID {:02X} {:04X}", manufacturer, device);
        Ok(Identity::SpiNor(JedecId {
            manufacturer,
            device,
        }))
    }

    fn read_data(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        spi25::fast_read_3b(&mut self.master, addr, buf)
    }

    fn write_data(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() || self.config.page_size == 0 {
            return Err(Error::InvalidAddressOrLength);
        }
        if addr as u64 + data.len() as u64 > AddressWidth::ThreeByte.limit() as u64 {
            return Err(Error::InvalidAddressOrLength);
        }

        let page_size = self.config.page_size;
        if (addr % page_size) as usize + data.len() > page_size as usize {
            log::debug!("spi: write at 0x{:06X} crosses a page boundary, splitting", addr);
        }

        let policy =
            PollPolicy::with_timeout_ms(self.config.program_timeout_ms).interval_us(PROGRAM_POLL_US);
        let mut written = 0usize;
        while written < data.len() {
            let cur = addr + written as u32;
            let room = (page_size - cur % page_size) as usize;
            let n = core::cmp::min(room, data.len() - written);
            log::trace!("spi: page program {} bytes at 0x{:06X}", n, cur);
            spi25::program_page_3b(
                &mut self.master,
                &self.clock,
                cur,
                &data[written..written + n],
                &policy,
            )?;
            written += n;
        }
        Ok(())
    }

    fn erase(&mut self, kind: EraseKind, addr: u32, progress: &mut dyn Progress) -> Result<()> {
        let cfg = self.config;
        match kind {
            EraseKind::Sector => {
                log::debug!("spi: sector erase at 0x{:06X}", addr);
                let policy = self.erase_policy(cfg.sector_erase_timeout_ms, SECTOR_POLL_US);
                spi25::erase_block(
                    &mut self.master,
                    &self.clock,
                    opcodes::SE_20,
                    addr,
                    &policy,
                    progress,
                )
            }
            EraseKind::Block => {
                log::debug!("spi: block erase at 0x{:06X}", addr);
                let policy = self.erase_policy(cfg.block_erase_timeout_ms, BLOCK_POLL_US);
                spi25::erase_block(
                    &mut self.master,
                    &self.clock,
                    opcodes::BE_D8,
                    addr,
                    &policy,
                    progress,
                )
            }
            EraseKind::Chip => {
                log::debug!("spi: chip erase");
                let policy = self.erase_policy(cfg.chip_erase_timeout_ms, CHIP_POLL_US);
                spi25::chip_erase(&mut self.master, &self.clock, &policy, progress)
            }
        }
    }

    fn read_status(&mut self) -> Result<Status> {
        let raw = spi25::read_status1(&mut self.master)?;
        Ok(Status::SpiNor(SpiStatus::from_raw(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::NoProgress;
    use crate::testing::{RecordingSpi, TestClock};
    use std::vec::Vec;

    fn engine(master: RecordingSpi) -> SpiNorEngine<RecordingSpi, TestClock> {
        SpiNorEngine::new(master, TestClock::new(), SpiNorConfig::default())
    }

    struct Ticks(usize);

    impl Progress for Ticks {
        fn waiting(&mut self, _elapsed_ms: u32) {
            self.0 += 1;
        }
        fn step(&mut self, _done: usize, _total: usize) {}
    }

    #[test]
    fn test_write_300_bytes_splits_at_page() {
        let mut spi = engine(RecordingSpi::new());
        let data: Vec<u8> = (0..300).map(|i| i as u8).collect();

        spi.write_data(0, &data).unwrap();

        let programs: Vec<_> = spi
            .master()
            .frames
            .iter()
            .filter(|f| f.opcode == opcodes::PP)
            .collect();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].address, Some(0x000000));
        assert_eq!(programs[0].write_data.len(), 256);
        assert_eq!(programs[1].address, Some(0x000100));
        assert_eq!(programs[1].write_data.len(), 44);
        assert_eq!(programs[1].write_data[..], data[256..]);
    }

    #[test]
    fn test_each_program_preceded_by_wren() {
        let mut spi = engine(RecordingSpi::new());

        spi.write_data(0xF0, &[0u8; 32]).unwrap();

        let ops: Vec<u8> = spi.master().non_poll_frames().iter().map(|f| f.opcode).collect();
        assert_eq!(ops, [opcodes::WREN, opcodes::PP, opcodes::WREN, opcodes::PP]);
        let programs: Vec<_> = spi
            .master()
            .frames
            .iter()
            .filter(|f| f.opcode == opcodes::PP)
            .map(|f| (f.address, f.write_data.len()))
            .collect();
        assert_eq!(programs, [(Some(0xF0), 16), (Some(0x100), 16)]);
    }

    #[test]
    fn test_read_is_chunked_fast_read() {
        let mut master = RecordingSpi::new();
        master.max_read = 100;
        let mut spi = engine(master);
        let mut buf = [0u8; 250];

        spi.read_data(0x1000, &mut buf).unwrap();

        let frames = &spi.master().frames;
        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.opcode, opcodes::FAST_READ);
            assert_eq!(frame.dummy_cycles, 8);
            assert_eq!(frame.address, Some(0x1000 + 100 * i as u32));
        }
        assert_eq!(frames[2].read_len, 50);
    }

    #[test]
    fn test_address_beyond_24_bits_is_rejected() {
        let mut spi = engine(RecordingSpi::new());
        let mut buf = [0u8; 16];

        assert_eq!(
            spi.read_data(0x0100_0000, &mut buf),
            Err(Error::InvalidAddressOrLength)
        );
        assert_eq!(
            spi.write_data(0x00FF_FFF8, &[0u8; 16]),
            Err(Error::InvalidAddressOrLength)
        );
        assert!(spi.master().frames.is_empty());
    }

    #[test]
    fn test_sector_erase_sequence() {
        let mut spi = engine(RecordingSpi::new());

        spi.erase(EraseKind::Sector, 0x3000, &mut NoProgress).unwrap();

        let frames = spi.master().non_poll_frames();
        assert_eq!(frames[0].opcode, opcodes::WREN);
        assert_eq!(frames[1].opcode, opcodes::SE_20);
        assert_eq!(frames[1].address, Some(0x3000));
    }

    #[test]
    fn test_chip_erase_has_no_address() {
        let mut spi = engine(RecordingSpi::new());

        spi.erase(EraseKind::Chip, 0x1234, &mut NoProgress).unwrap();

        let frames = spi.master().non_poll_frames();
        assert_eq!(frames[1].opcode, opcodes::CE_C7);
        assert_eq!(frames[1].address, None);
    }

    #[test]
    fn test_stuck_busy_erase_times_out_with_progress() {
        let mut master = RecordingSpi::new();
        master.status = opcodes::SR1_WIP;
        let mut spi = engine(master);
        let mut ticks = Ticks(0);

        let result = spi.erase(EraseKind::Sector, 0, &mut ticks);

        assert_eq!(result, Err(Error::Timeout));
        // 1 s bound with a report every 500 ms
        assert_eq!(ticks.0, 1);
        assert!(spi.clock.now_us() >= 1_000_000);
    }

    #[test]
    fn test_identify_and_status() {
        let mut master = RecordingSpi::new();
        master.status = 0x02;
        let mut spi = engine(master);

        assert_eq!(
            spi.identify().unwrap(),
            Identity::SpiNor(JedecId {
                manufacturer: 0xEF,
                device: 0x4018
            })
        );
        assert_eq!(spi.read_status().unwrap(), Status::SpiNor(SpiStatus::WEL));
    }
}
