//! ONFI-style parallel NAND command sequences
//!
//! Commands are latched with CLE high, addresses with ALE high. Column
//! addresses are two bytes and row (page) addresses three bytes, both LSB
//! first. Chip enable is handled by [`with_chip_enabled`], which releases
//! CE# on every exit path.

use crate::error::Result;
use crate::programmer::ParallelBus;

/// Read ID
pub const CMD_READ_ID: u8 = 0x90;
/// Read status register
pub const CMD_READ_STATUS: u8 = 0x70;
/// Page read, first cycle
pub const CMD_READ: u8 = 0x00;
/// Page read, confirm
pub const CMD_READ_CONFIRM: u8 = 0x30;
/// Page program, first cycle
pub const CMD_PROGRAM: u8 = 0x80;
/// Page program, confirm
pub const CMD_PROGRAM_CONFIRM: u8 = 0x10;
/// Block erase, first cycle
pub const CMD_ERASE: u8 = 0x60;
/// Block erase, confirm
pub const CMD_ERASE_CONFIRM: u8 = 0xD0;
/// Reset
pub const CMD_RESET: u8 = 0xFF;

/// Run `f` with CE# asserted, always releasing it afterwards
///
/// An error from `f` takes precedence over an error releasing CE#.
pub fn with_chip_enabled<B, T, F>(bus: &mut B, f: F) -> Result<T>
where
    B: ParallelBus + ?Sized,
    F: FnOnce(&mut B) -> Result<T>,
{
    bus.set_chip_enable(true)?;
    let result = f(bus);
    let released = bus.set_chip_enable(false);
    let value = result?;
    released?;
    Ok(value)
}

/// Latch a command byte
pub fn command<B: ParallelBus + ?Sized>(bus: &mut B, opcode: u8) -> Result<()> {
    log::trace!("nand: cmd 0x{:02X}", opcode);
    bus.set_command_latch(true)?;
    let result = bus.write_byte(opcode);
    bus.set_command_latch(false)?;
    result
}

/// Latch one or more address bytes
pub fn address<B: ParallelBus + ?Sized>(bus: &mut B, bytes: &[u8]) -> Result<()> {
    log::trace!("nand: addr {:02X?}", bytes);
    bus.set_address_latch(true)?;
    let result = bytes.iter().try_for_each(|&b| bus.write_byte(b));
    bus.set_address_latch(false)?;
    result
}

/// Five address cycles: column (2 bytes) then page (3 bytes), LSB first
pub fn page_address(column: u32, page: u32) -> [u8; 5] {
    [
        column as u8,
        (column >> 8) as u8,
        page as u8,
        (page >> 8) as u8,
        (page >> 16) as u8,
    ]
}

/// Three address cycles for a block erase, LSB first
pub fn block_address(block: u32) -> [u8; 3] {
    [block as u8, (block >> 8) as u8, (block >> 16) as u8]
}

/// Clock data bytes out
pub fn write_data<B: ParallelBus + ?Sized>(bus: &mut B, data: &[u8]) -> Result<()> {
    data.iter().try_for_each(|&b| bus.write_byte(b))
}

/// Clock data bytes in
pub fn read_data<B: ParallelBus + ?Sized>(bus: &mut B, buf: &mut [u8]) -> Result<()> {
    for b in buf.iter_mut() {
        *b = bus.read_byte()?;
    }
    Ok(())
}

/// Issue READ STATUS and return the raw byte (CE# must already be asserted)
pub fn read_status<B: ParallelBus + ?Sized>(bus: &mut B) -> Result<u8> {
    command(bus, CMD_READ_STATUS)?;
    bus.read_byte()
}
