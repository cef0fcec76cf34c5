//! Parallel NAND engine

use super::{EraseKind, MemoryEngine, Technology};
use crate::chip::{Identity, NandId, NandStatus, Status};
use crate::config::NandConfig;
use crate::error::{Error, FailedOperation, Result};
use crate::poll::{await_ready, Clock, PollOutcome, PollPolicy, Progress};
use crate::programmer::ParallelBus;
use crate::protocol::nand;

/// R/B# sampling interval
const READY_POLL_INTERVAL_US: u32 = 10;

/// Parallel NAND protocol engine
///
/// Every operation is framed by CE#: select, command latch, address latch,
/// data, confirm, wait for R/B#, status check, deselect. CE# is released
/// on every exit path, including timeouts.
pub struct NandEngine<P, C> {
    bus: P,
    clock: C,
    config: NandConfig,
}

impl<P: ParallelBus, C: Clock> NandEngine<P, C> {
    /// Create an engine over `bus`
    pub fn new(bus: P, clock: C, config: NandConfig) -> Self {
        Self { bus, clock, config }
    }

    /// Geometry and timing in use
    pub fn config(&self) -> &NandConfig {
        &self.config
    }

    /// Access the underlying bus
    pub fn bus(&self) -> &P {
        &self.bus
    }

    /// Mutable access to the underlying bus
    pub fn bus_mut(&mut self) -> &mut P {
        &mut self.bus
    }

    /// Issue RESET and wait for the device to come back
    pub fn reset(&mut self) -> Result<()> {
        let clock = &self.clock;
        let timeout_ms = self.config.ready_timeout_ms;
        nand::with_chip_enabled(&mut self.bus, |bus| {
            nand::command(bus, nand::CMD_RESET)?;
            wait_ready(bus, clock, timeout_ms)
        })
    }

    fn device_size(&self) -> u64 {
        self.config.block_size as u64 * self.config.block_count as u64
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if addr as u64 + len as u64 > self.device_size() {
            return Err(Error::InvalidAddressOrLength);
        }
        Ok(())
    }

    fn read_page(&mut self, page: u32, column: u32, buf: &mut [u8]) -> Result<()> {
        let clock = &self.clock;
        let timeout_ms = self.config.ready_timeout_ms;
        nand::with_chip_enabled(&mut self.bus, |bus| {
            nand::command(bus, nand::CMD_READ)?;
            nand::address(bus, &nand::page_address(column, page))?;
            nand::command(bus, nand::CMD_READ_CONFIRM)?;
            wait_ready(bus, clock, timeout_ms)?;
            nand::read_data(bus, buf)
        })
    }

    /// Erase one block by index
    pub fn erase_block(&mut self, block: u32) -> Result<()> {
        if block >= self.config.block_count {
            return Err(Error::InvalidAddressOrLength);
        }
        log::debug!("nand: erasing block {}", block);

        let clock = &self.clock;
        let timeout_ms = self.config.ready_timeout_ms;
        let status = nand::with_chip_enabled(&mut self.bus, |bus| {
            nand::command(bus, nand::CMD_ERASE)?;
            nand::address(bus, &nand::block_address(block))?;
            nand::command(bus, nand::CMD_ERASE_CONFIRM)?;
            wait_ready(bus, clock, timeout_ms)?;
            nand::read_status(bus)
        })?;

        if NandStatus::from_raw(status).failed() {
            let addr = block * self.config.block_size;
            log::warn!("nand: erase failed at block {} (status 0x{:02X})", block, status);
            return Err(Error::OperationFailed(FailedOperation::Erase { addr }));
        }
        Ok(())
    }
}

fn wait_ready<P, C>(bus: &mut P, clock: &C, timeout_ms: u32) -> Result<()>
where
    P: ParallelBus + ?Sized,
    C: Clock + ?Sized,
{
    let policy = PollPolicy::with_timeout_ms(timeout_ms).interval_us(READY_POLL_INTERVAL_US);
    match await_ready(clock, &policy, || bus.is_ready())? {
        PollOutcome::Ready => Ok(()),
        PollOutcome::TimedOut => {
            log::warn!("nand: R/B# still busy after {} ms", timeout_ms);
            Err(Error::Timeout)
        }
    }
}

impl<P: ParallelBus, C: Clock> MemoryEngine for NandEngine<P, C> {
    fn technology(&self) -> Technology {
        Technology::Nand
    }

    fn on_select(&mut self) -> Result<()> {
        self.reset()
    }

    fn identify(&mut self) -> Result<Identity> {
        let mut id = NandId { bytes: [0; 5] };
        nand::with_chip_enabled(&mut self.bus, |bus| {
            nand::command(bus, nand::CMD_READ_ID)?;
            nand::address(bus, &[0x00])?;
            nand::read_data(bus, &mut id.bytes)
        })?;
        log::debug!("nand: id {:02X?}", id.bytes);
        Ok(Identity::Nand(id))
    }

    fn read_data(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.check_range(addr, buf.len())?;

        let page_size = self.config.page_size as usize;
        let mut done = 0;
        while done < buf.len() {
            let cur = addr + done as u32;
            let page = cur / self.config.page_size;
            let column = cur % self.config.page_size;
            let n = core::cmp::min(page_size - column as usize, buf.len() - done);
            self.read_page(page, column, &mut buf[done..done + n])?;
            done += n;
        }
        Ok(())
    }

    fn write_data(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidAddressOrLength);
        }
        let page = addr / self.config.page_size;
        let column = addr % self.config.page_size;
        if column as usize + data.len() > self.config.page_size as usize {
            return Err(Error::PageBoundaryViolation);
        }
        self.check_range(addr, data.len())?;

        log::debug!("nand: programming {} bytes at page {} column {}", data.len(), page, column);
        let clock = &self.clock;
        let timeout_ms = self.config.ready_timeout_ms;
        let status = nand::with_chip_enabled(&mut self.bus, |bus| {
            nand::command(bus, nand::CMD_PROGRAM)?;
            nand::address(bus, &nand::page_address(column, page))?;
            nand::write_data(bus, data)?;
            nand::command(bus, nand::CMD_PROGRAM_CONFIRM)?;
            wait_ready(bus, clock, timeout_ms)?;
            nand::read_status(bus)
        })?;

        if NandStatus::from_raw(status).failed() {
            log::warn!("nand: program failed at page {} (status 0x{:02X})", page, status);
            return Err(Error::OperationFailed(FailedOperation::Program));
        }
        Ok(())
    }

    fn erase(&mut self, kind: EraseKind, addr: u32, progress: &mut dyn Progress) -> Result<()> {
        match kind {
            // no sub-block erase on NAND
            EraseKind::Sector | EraseKind::Block => self.erase_block(addr / self.config.block_size),
            EraseKind::Chip => {
                let total = self.config.block_count as usize;
                for block in 0..self.config.block_count {
                    self.erase_block(block)?;
                    progress.step(block as usize + 1, total);
                }
                Ok(())
            }
        }
    }

    fn read_status(&mut self) -> Result<Status> {
        let raw = nand::with_chip_enabled(&mut self.bus, |bus| nand::read_status(bus))?;
        Ok(Status::Nand(NandStatus::from_raw(raw)))
    }
}
