//! Transport trait definitions
//!
//! Implementations exist for real GPIO lines (`uniprog-linux-gpio`) and for
//! simulated chips (`uniprog-dummy`). All methods are blocking.

use crate::config::BusAddress;
use crate::error::Result;
use crate::spi::SpiCommand;

/// SPI Master trait
///
/// Every call to [`execute`](Self::execute) is one complete chip-select
/// cycle: CS is asserted before the opcode and released after the last data
/// byte, so WREN and the command it enables are always separate frames.
pub trait SpiMaster {
    /// Get the maximum number of bytes that can be read in a single transaction
    fn max_read_len(&self) -> usize;

    /// Execute a single SPI command
    ///
    /// The command contains all the information needed for the transaction:
    /// - `opcode`: The SPI command opcode
    /// - `address`: Optional address (with width)
    /// - `dummy_cycles`: Number of dummy clock cycles after address
    /// - `write_data`: Data to write after the header
    /// - `read_buf`: Buffer to read data into
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;
}

/// Byte-wide parallel bus with NAND control strobes
///
/// The engine drives the latch lines explicitly; `write_byte` pulses WE#
/// and `read_byte` pulses RE#. Chip enable is active-low on the wire but
/// `true` here always means "selected".
pub trait ParallelBus {
    /// Assert (`true`) or release CE#
    fn set_chip_enable(&mut self, active: bool) -> Result<()>;

    /// Drive the command latch enable line
    fn set_command_latch(&mut self, active: bool) -> Result<()>;

    /// Drive the address latch enable line
    fn set_address_latch(&mut self, active: bool) -> Result<()>;

    /// Put a byte on the data lines and pulse WE#
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Pulse RE# and sample the data lines
    fn read_byte(&mut self) -> Result<u8>;

    /// Sample the R/B# line (`true` = ready)
    fn is_ready(&mut self) -> Result<bool>;
}

/// Addressed two-wire bus (I2C)
///
/// Each method is one START..STOP transaction with a 7-bit address.
pub trait I2cBus {
    /// Address-only write transaction; returns whether the device ACKed
    fn probe(&mut self, addr: BusAddress) -> Result<bool>;

    /// Write transaction
    ///
    /// A NACK on the address or any data byte ends the transaction and
    /// returns [`Error::BusNotResponding`](crate::Error::BusNotResponding).
    fn write(&mut self, addr: BusAddress, bytes: &[u8]) -> Result<()>;

    /// Read transaction; returns the number of bytes actually received
    fn read(&mut self, addr: BusAddress, buf: &mut [u8]) -> Result<usize>;
}

// Blanket impls for boxed transports so the binary can pick a backend at runtime
#[cfg(feature = "alloc")]
impl SpiMaster for alloc::boxed::Box<dyn SpiMaster> {
    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }
}

#[cfg(feature = "alloc")]
impl ParallelBus for alloc::boxed::Box<dyn ParallelBus> {
    fn set_chip_enable(&mut self, active: bool) -> Result<()> {
        (**self).set_chip_enable(active)
    }

    fn set_command_latch(&mut self, active: bool) -> Result<()> {
        (**self).set_command_latch(active)
    }

    fn set_address_latch(&mut self, active: bool) -> Result<()> {
        (**self).set_address_latch(active)
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn is_ready(&mut self) -> Result<bool> {
        (**self).is_ready()
    }
}

#[cfg(feature = "alloc")]
impl I2cBus for alloc::boxed::Box<dyn I2cBus> {
    fn probe(&mut self, addr: BusAddress) -> Result<bool> {
        (**self).probe(addr)
    }

    fn write(&mut self, addr: BusAddress, bytes: &[u8]) -> Result<()> {
        (**self).write(addr, bytes)
    }

    fn read(&mut self, addr: BusAddress, buf: &mut [u8]) -> Result<usize> {
        (**self).read(addr, buf)
    }
}

/// Helper function for implementing `SpiMaster::execute()`.
///
/// Builds the full outgoing byte stream (header + write data) and hands it,
/// together with the command's read buffer, to `transfer_fn`.
///
/// # Example
///
/// ```ignore
/// fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
///     default_execute(cmd, |write_data, read_buf| {
///         self.transfer(write_data, read_buf)
///     })
/// }
/// ```
#[cfg(feature = "alloc")]
pub fn default_execute<F>(cmd: &mut SpiCommand<'_>, transfer_fn: F) -> Result<()>
where
    F: FnOnce(&[u8], &mut [u8]) -> Result<()>,
{
    let header_len = cmd.header_len();
    let mut write_data = alloc::vec![0u8; header_len + cmd.write_data.len()];
    cmd.encode_header(&mut write_data);
    write_data[header_len..].copy_from_slice(cmd.write_data);

    transfer_fn(&write_data, cmd.read_buf)
}
