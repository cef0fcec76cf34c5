//! Bitbang helpers for GPIO-driven transports
//!
//! Programmers that toggle GPIO lines in software implement one of the
//! low-level traits here and build their [`SpiMaster`](super::SpiMaster) or
//! [`I2cBus`](super::I2cBus) on top of the helper functions in [`single`]
//! and [`i2c`].
//!
//! Timing comes entirely from `half_period_delay`; nothing here sleeps on
//! its own.

/// Trait for low-level bitbang SPI operations
///
/// This trait provides the minimal set of operations needed for bitbanging
/// SPI mode 0 (clock idles low, data sampled on the rising edge).
pub trait BitbangSpiMaster {
    /// Set chip select (CS is active low, so `active=true` means CS=0)
    fn set_cs(&mut self, active: bool);

    /// Set clock line value
    fn set_sck(&mut self, high: bool);

    /// Set MOSI line value
    fn set_mosi(&mut self, high: bool);

    /// Get MISO line value
    fn get_miso(&self) -> bool;

    /// Delay for half a clock period
    fn half_period_delay(&self);

    /// Optional: Set SCK and MOSI atomically (optimization)
    ///
    /// Default implementation calls `set_sck` then `set_mosi`.
    fn set_sck_set_mosi(&mut self, sck: bool, mosi: bool) {
        self.set_sck(sck);
        self.set_mosi(mosi);
    }

    /// Optional: Set SCK and get MISO atomically (optimization)
    ///
    /// Default implementation calls `set_sck` then `get_miso`.
    fn set_sck_get_miso(&mut self, sck: bool) -> bool {
        self.set_sck(sck);
        self.get_miso()
    }
}

/// Bitbang helper functions for single-wire SPI
///
/// These are standalone functions that can be used by any `BitbangSpiMaster` implementation.
pub mod single {
    use super::BitbangSpiMaster;

    /// Write a byte in single-wire mode (MSB first)
    pub fn write_byte<M: BitbangSpiMaster + ?Sized>(master: &mut M, byte: u8) {
        for i in (0..8).rev() {
            let bit = (byte >> i) & 1 != 0;
            master.set_sck_set_mosi(false, bit);
            master.half_period_delay();
            master.set_sck(true);
            master.half_period_delay();
        }
    }

    /// Read a byte in single-wire mode (MSB first)
    pub fn read_byte<M: BitbangSpiMaster + ?Sized>(master: &mut M) -> u8 {
        let mut byte = 0u8;
        for _ in 0..8 {
            master.set_sck(false);
            master.half_period_delay();
            byte <<= 1;
            if master.set_sck_get_miso(true) {
                byte |= 1;
            }
            master.half_period_delay();
        }
        byte
    }

    /// Write multiple bytes in single-wire mode
    pub fn write_bytes<M: BitbangSpiMaster + ?Sized>(master: &mut M, bytes: &[u8]) {
        for &byte in bytes {
            write_byte(master, byte);
        }
    }

    /// Read multiple bytes in single-wire mode
    pub fn read_bytes<M: BitbangSpiMaster + ?Sized>(master: &mut M, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = read_byte(master);
        }
    }

    /// One complete chip-select framed transfer: write phase then read phase
    pub fn transfer<M: BitbangSpiMaster + ?Sized>(master: &mut M, write: &[u8], read: &mut [u8]) {
        master.set_cs(true);
        write_bytes(master, write);
        read_bytes(master, read);
        master.set_sck(false);
        master.half_period_delay();
        master.set_cs(false);
        master.half_period_delay();
    }
}

/// Trait for low-level bitbang I2C operations
///
/// Both lines are open-drain: `true` releases the line (pulled high),
/// `false` drives it low.
pub trait BitbangI2c {
    /// Release or drive SCL
    fn set_scl(&mut self, high: bool);

    /// Release or drive SDA
    fn set_sda(&mut self, high: bool);

    /// Sample SDA
    fn get_sda(&self) -> bool;

    /// Delay for half a clock period
    fn half_period_delay(&self);
}

/// Bitbang helper functions for I2C
///
/// Transactions are built from [`start`], [`write_byte`], [`read_byte`] and
/// [`stop`]; the `*_transaction` helpers cover the common shapes.
pub mod i2c {
    use super::BitbangI2c;
    use crate::config::BusAddress;

    /// START condition: SDA falls while SCL is high
    pub fn start<B: BitbangI2c + ?Sized>(bus: &mut B) {
        bus.set_sda(true);
        bus.set_scl(true);
        bus.half_period_delay();
        bus.set_sda(false);
        bus.half_period_delay();
        bus.set_scl(false);
    }

    /// STOP condition: SDA rises while SCL is high
    pub fn stop<B: BitbangI2c + ?Sized>(bus: &mut B) {
        bus.set_sda(false);
        bus.half_period_delay();
        bus.set_scl(true);
        bus.half_period_delay();
        bus.set_sda(true);
        bus.half_period_delay();
    }

    /// Clock out a byte MSB first; returns true if the receiver ACKed
    pub fn write_byte<B: BitbangI2c + ?Sized>(bus: &mut B, byte: u8) -> bool {
        for i in (0..8).rev() {
            bus.set_sda((byte >> i) & 1 != 0);
            bus.half_period_delay();
            bus.set_scl(true);
            bus.half_period_delay();
            bus.set_scl(false);
        }
        bus.set_sda(true);
        bus.half_period_delay();
        bus.set_scl(true);
        bus.half_period_delay();
        let ack = !bus.get_sda();
        bus.set_scl(false);
        ack
    }

    /// Clock in a byte MSB first, then ACK (`ack=true`) or NACK it
    pub fn read_byte<B: BitbangI2c + ?Sized>(bus: &mut B, ack: bool) -> u8 {
        let mut byte = 0u8;
        bus.set_sda(true);
        for _ in 0..8 {
            bus.half_period_delay();
            bus.set_scl(true);
            bus.half_period_delay();
            byte <<= 1;
            if bus.get_sda() {
                byte |= 1;
            }
            bus.set_scl(false);
        }
        bus.set_sda(!ack);
        bus.half_period_delay();
        bus.set_scl(true);
        bus.half_period_delay();
        bus.set_scl(false);
        bus.set_sda(true);
        byte
    }

    /// Address byte for a write (R/W# = 0)
    pub fn write_address(addr: BusAddress) -> u8 {
        addr.get() << 1
    }

    /// Address byte for a read (R/W# = 1)
    pub fn read_address(addr: BusAddress) -> u8 {
        (addr.get() << 1) | 1
    }

    /// START, address+W, payload, STOP; stops at the first NACK
    ///
    /// Returns true if every byte was acknowledged.
    pub fn write_transaction<B: BitbangI2c + ?Sized>(
        bus: &mut B,
        addr: BusAddress,
        bytes: &[u8],
    ) -> bool {
        start(bus);
        let mut acked = write_byte(bus, write_address(addr));
        for &b in bytes {
            if !acked {
                break;
            }
            acked = write_byte(bus, b);
        }
        stop(bus);
        acked
    }

    /// START, address+R, read `buf.len()` bytes, STOP
    ///
    /// Returns the number of bytes read (0 if the address was NACKed).
    pub fn read_transaction<B: BitbangI2c + ?Sized>(
        bus: &mut B,
        addr: BusAddress,
        buf: &mut [u8],
    ) -> usize {
        start(bus);
        if !write_byte(bus, read_address(addr)) {
            stop(bus);
            return 0;
        }
        let last = buf.len().saturating_sub(1);
        for (i, b) in buf.iter_mut().enumerate() {
            *b = read_byte(bus, i != last);
        }
        stop(bus);
        buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusAddress;
    use std::vec::Vec;

    /// Records MOSI bits on rising clock edges and shifts out a fixed MISO pattern
    struct LoopbackSpi {
        sck: bool,
        mosi: bool,
        cs: bool,
        sent_bits: Vec<bool>,
        miso_pattern: u8,
        miso_index: usize,
    }

    impl BitbangSpiMaster for LoopbackSpi {
        fn set_cs(&mut self, active: bool) {
            self.cs = active;
        }

        fn set_sck(&mut self, high: bool) {
            if high && !self.sck && self.cs {
                self.sent_bits.push(self.mosi);
            }
            self.sck = high;
        }

        fn set_mosi(&mut self, high: bool) {
            self.mosi = high;
        }

        fn get_miso(&self) -> bool {
            (self.miso_pattern >> (7 - (self.miso_index % 8))) & 1 != 0
        }

        fn set_sck_get_miso(&mut self, sck: bool) -> bool {
            self.set_sck(sck);
            let bit = self.get_miso();
            self.miso_index += 1;
            bit
        }

        fn half_period_delay(&self) {}
    }

    #[test]
    fn test_single_write_is_msb_first() {
        let mut spi = LoopbackSpi {
            sck: false,
            mosi: false,
            cs: false,
            sent_bits: Vec::new(),
            miso_pattern: 0,
            miso_index: 0,
        };

        let mut read = [0u8; 1];
        spi.miso_pattern = 0xA5;
        single::transfer(&mut spi, &[0x9F], &mut read);

        let expected: Vec<bool> = (0..8).rev().map(|i| (0x9F >> i) & 1 != 0).collect();
        assert_eq!(&spi.sent_bits[..8], &expected[..]);
        assert_eq!(read[0], 0xA5);
        assert!(!spi.cs);
    }

    #[test]
    fn test_i2c_address_bytes() {
        let addr = BusAddress::new(0x50).unwrap();
        assert_eq!(i2c::write_address(addr), 0xA0);
        assert_eq!(i2c::read_address(addr), 0xA1);
    }
}
