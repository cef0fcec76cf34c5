//! SPI25 protocol implementation
//!
//! This module implements the common JEDEC serial flash command sequences.
//! Every function issues complete chip-select frames through
//! [`SpiMaster::execute`]; waits go through the readiness poller.

use crate::error::{Error, Result};
use crate::poll::{await_ready_reporting, Clock, PollOutcome, PollPolicy, Progress};
use crate::programmer::SpiMaster;
use crate::spi::{opcodes, AddressWidth, SpiCommand};

/// Read the JEDEC ID from a flash chip
///
/// Returns (manufacturer_id, device_id) on success.
pub fn read_jedec_id<M: SpiMaster + ?Sized>(master: &mut M) -> Result<(u8, u16)> {
    let mut buf = [0u8; 3];
    let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut buf);
    master.execute(&mut cmd)?;

    let manufacturer = buf[0];
    let device = ((buf[1] as u16) << 8) | (buf[2] as u16);

    Ok((manufacturer, device))
}

/// Read the status register 1
pub fn read_status1<M: SpiMaster + ?Sized>(master: &mut M) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(opcodes::RDSR, &mut buf);
    master.execute(&mut cmd)?;
    Ok(buf[0])
}

/// Send the Write Enable command
pub fn write_enable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WREN);
    master.execute(&mut cmd)
}

/// Wait for the WIP (Write In Progress) bit to clear
///
/// Polls the status register under `policy`, reporting to `progress`.
/// Returns [`Error::Timeout`] if the bit is still set when the bound expires.
pub fn wait_ready<M, C>(
    master: &mut M,
    clock: &C,
    policy: &PollPolicy,
    progress: &mut dyn Progress,
) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    let outcome = await_ready_reporting(
        clock,
        policy,
        || Ok(read_status1(master)? & opcodes::SR1_WIP == 0),
        progress,
    )?;

    match outcome {
        PollOutcome::Ready => Ok(()),
        PollOutcome::TimedOut => Err(Error::Timeout),
    }
}

/// Read data with FAST_READ (0x0B) and 3-byte addressing
///
/// The read is split into transactions of at most `max_read_len()` bytes.
/// The whole range must fit in the 24-bit address space.
pub fn fast_read_3b<M: SpiMaster + ?Sized>(master: &mut M, addr: u32, buf: &mut [u8]) -> Result<()> {
    check_range_3b(addr, buf.len())?;

    let max_len = master.max_read_len().max(1);
    let mut offset = 0;

    while offset < buf.len() {
        let chunk_len = core::cmp::min(max_len, buf.len() - offset);
        let chunk = &mut buf[offset..offset + chunk_len];
        let mut cmd = SpiCommand::read_3b(opcodes::FAST_READ, addr + offset as u32, chunk)
            .with_dummy_cycles(opcodes::FAST_READ_DUMMY_CYCLES);
        master.execute(&mut cmd)?;
        offset += chunk_len;
    }

    Ok(())
}

/// Program a single page (up to page_size bytes)
///
/// The data must not cross a page boundary; the caller splits.
pub fn program_page_3b<M, C>(
    master: &mut M,
    clock: &C,
    addr: u32,
    data: &[u8],
    policy: &PollPolicy,
) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    check_range_3b(addr, data.len())?;
    write_enable(master)?;

    let mut cmd = SpiCommand::write_3b(opcodes::PP, addr, data);
    master.execute(&mut cmd)?;

    wait_ready(master, clock, policy, &mut crate::poll::NoProgress)
}

/// Erase a sector/block at the given address
pub fn erase_block<M, C>(
    master: &mut M,
    clock: &C,
    opcode: u8,
    addr: u32,
    policy: &PollPolicy,
    progress: &mut dyn Progress,
) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    check_range_3b(addr, 1)?;
    write_enable(master)?;

    let mut cmd = SpiCommand::erase_3b(opcode, addr);
    master.execute(&mut cmd)?;

    wait_ready(master, clock, policy, progress)
}

/// Erase the entire chip
pub fn chip_erase<M, C>(
    master: &mut M,
    clock: &C,
    policy: &PollPolicy,
    progress: &mut dyn Progress,
) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    write_enable(master)?;

    let mut cmd = SpiCommand::simple(opcodes::CE_C7);
    master.execute(&mut cmd)?;

    wait_ready(master, clock, policy, progress)
}

fn check_range_3b(addr: u32, len: usize) -> Result<()> {
    let end = addr as u64 + len as u64;
    if end > AddressWidth::ThreeByte.limit() as u64 {
        return Err(Error::InvalidAddressOrLength);
    }
    Ok(())
}
