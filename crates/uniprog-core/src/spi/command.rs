//! SPI command structure

use super::AddressWidth;

/// A single chip-select framed SPI transaction
///
/// The transaction is: CS low, opcode, address (if any), dummy clocks, write
/// data, read data, CS high. It borrows its buffers so no allocation is
/// needed to build one.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Number of dummy cycles after address (multiple of 8)
    pub dummy_cycles: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g., WREN)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a read register command with no address (e.g., RDSR, RDID)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            read_buf: buf,
            ..Self::simple(opcode)
        }
    }

    /// Create a read command with 3-byte address
    pub fn read_3b(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            read_buf: buf,
            ..Self::simple(opcode)
        }
    }

    /// Create a write command with 3-byte address (e.g., PP)
    pub fn write_3b(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            write_data: data,
            ..Self::simple(opcode)
        }
    }

    /// Create an erase command with 3-byte address
    pub fn erase_3b(opcode: u8, addr: u32) -> Self {
        Self {
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            ..Self::simple(opcode)
        }
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Number of bytes before the write payload: opcode, address, dummy bytes
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + (self.dummy_cycles as usize) / 8
    }

    /// Encode opcode, address and dummy bytes into the start of `buf`
    ///
    /// `buf` must be at least [`header_len`](Self::header_len) bytes long.
    /// Dummy bytes are sent as 0x00.
    pub fn encode_header(&self, buf: &mut [u8]) {
        buf[0] = self.opcode;
        let addr_len = self.address_width.bytes() as usize;
        if let Some(addr) = self.address {
            self.address_width.encode(addr, &mut buf[1..1 + addr_len]);
        }
        for b in &mut buf[1 + addr_len..self.header_len()] {
            *b = 0;
        }
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }
}
