//! 24Cxx-style I2C EEPROM transactions
//!
//! These parts have no command set: a write transaction carries the memory
//! pointer (one or two bytes, MSB first) optionally followed by data, and a
//! read transaction continues from the current pointer.

use crate::config::BusAddress;
use crate::error::{Error, Result};
use crate::programmer::I2cBus;

/// Largest page size a single write transaction is built for
pub const MAX_PAGE_SIZE: usize = 256;

/// Memory pointer bytes for `mem_addr` at the given width, MSB first
fn pointer(mem_addr: u32, width: usize) -> ([u8; 2], usize) {
    if width == 2 {
        ([(mem_addr >> 8) as u8, mem_addr as u8], 2)
    } else {
        ([mem_addr as u8, 0], 1)
    }
}

/// Load the device's memory pointer
pub fn set_pointer<B: I2cBus + ?Sized>(
    bus: &mut B,
    dev: BusAddress,
    mem_addr: u32,
    width: usize,
) -> Result<()> {
    let (ptr, len) = pointer(mem_addr, width);
    bus.write(dev, &ptr[..len])
}

/// Read `buf.len()` bytes starting at `mem_addr`
///
/// A short read (fewer bytes delivered than requested) is a transfer failure.
pub fn read_at<B: I2cBus + ?Sized>(
    bus: &mut B,
    dev: BusAddress,
    mem_addr: u32,
    width: usize,
    buf: &mut [u8],
) -> Result<()> {
    set_pointer(bus, dev, mem_addr, width)?;
    let got = bus.read(dev, buf)?;
    if got < buf.len() {
        log::warn!(
            "eeprom: short read at 0x{:04X} ({} of {} bytes)",
            mem_addr,
            got,
            buf.len()
        );
        return Err(Error::TransferFailed);
    }
    Ok(())
}

/// Pointer + data in a single write transaction
///
/// `data` must not cross a device page; the caller splits.
pub fn write_at<B: I2cBus + ?Sized>(
    bus: &mut B,
    dev: BusAddress,
    mem_addr: u32,
    width: usize,
    data: &[u8],
) -> Result<()> {
    let (ptr, len) = pointer(mem_addr, width);
    let mut frame: heapless::Vec<u8, { MAX_PAGE_SIZE + 2 }> = heapless::Vec::new();
    frame
        .extend_from_slice(&ptr[..len])
        .map_err(|_| Error::InvalidAddressOrLength)?;
    frame
        .extend_from_slice(data)
        .map_err(|_| Error::InvalidAddressOrLength)?;
    log::trace!("eeprom: write {} bytes at 0x{:04X}", data.len(), mem_addr);
    bus.write(dev, &frame)
}

/// Ready probe: a pointer write to address 0 is only ACKed outside the
/// internal write cycle
pub fn is_ready<B: I2cBus + ?Sized>(bus: &mut B, dev: BusAddress) -> Result<bool> {
    match bus.write(dev, &[0x00]) {
        Ok(()) => Ok(true),
        Err(Error::BusNotResponding) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_widths() {
        assert_eq!(pointer(0x1234, 2), ([0x12, 0x34], 2));
        assert_eq!(pointer(0x34, 1).1, 1);
        assert_eq!(pointer(0x34, 1).0[0], 0x34);
    }
}
