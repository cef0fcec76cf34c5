//! uniprog-linux-gpio - Linux GPIO bitbang transports
//!
//! This crate drives NAND, SPI NOR and I2C EEPROM parts from plain GPIO
//! lines using the Linux character device GPIO interface (gpiocdev).
//!
//! # Overview
//!
//! Each bus gets its own line request on the same GPIO chip:
//!
//! - [`LinuxGpioNand`]: eight data lines plus CE#, CLE, ALE, WE#, RE# and R/B#
//! - [`LinuxGpioSpi`]: CS#, SCK, MOSI and MISO, mode 0
//! - [`LinuxGpioI2c`]: SCL and an open-drain emulated SDA
//!
//! Buses without pins in the option string are replaced by [`Unwired`],
//! which fails every transfer.
//!
//! # Usage with the uniprog CLI
//!
//! ```bash
//! # SPI flash only
//! uniprog -b linux_gpio:dev=/dev/gpiochip0,cs=25,sck=11,mosi=10,miso=9 identify -t spi
//!
//! # I2C EEPROM at 400 kHz on gpiochip1
//! uniprog -b linux_gpio:gpiochip=1,scl=3,sda=2,speed=400 scan
//!
//! # NAND with D0..D7 on lines 4..11
//! uniprog -b linux_gpio:dev=/dev/gpiochip0,ce=20,cle=21,ale=22,we=23,re=24,rb=25,data=4 identify -t nand
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support (kernel 5.5+ for v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)
//! - External pull-ups on SDA and SCL, and on R/B# for NAND

pub mod config;
pub mod error;
mod i2c;
mod nand;
mod spi;

use std::time::Duration;

use gpiocdev::line::Value;

use uniprog_core::config::BusAddress;
use uniprog_core::error::{Error as CoreError, Result as CoreResult};
use uniprog_core::programmer::{I2cBus, ParallelBus, SpiMaster};
use uniprog_core::spi::SpiCommand;

// Re-exports
pub use config::{parse_options, I2cPins, LinuxGpioConfig, NandPins, SpiPins};
pub use error::{LinuxGpioError, Result};
pub use i2c::LinuxGpioI2c;
pub use nand::LinuxGpioNand;
pub use spi::LinuxGpioSpi;

/// Sleep for one half clock period
pub(crate) fn half_period(ns: u64) {
    if ns > 0 {
        std::thread::sleep(Duration::from_nanos(ns));
    }
}

pub(crate) fn level(high: bool) -> Value {
    if high {
        Value::Active
    } else {
        Value::Inactive
    }
}

/// Stand-in for a bus that has no pins assigned
///
/// Every transfer fails with [`TransferFailed`](CoreError::TransferFailed).
#[derive(Debug, Clone, Copy)]
pub struct Unwired {
    bus: &'static str,
}

impl Unwired {
    /// Placeholder for the named bus
    pub const fn new(bus: &'static str) -> Self {
        Self { bus }
    }

    fn fail<T>(&self) -> CoreResult<T> {
        log::error!("linux_gpio: No pins assigned to the {} bus", self.bus);
        Err(CoreError::TransferFailed)
    }
}

impl SpiMaster for Unwired {
    fn max_read_len(&self) -> usize {
        usize::MAX
    }

    fn execute(&mut self, _cmd: &mut SpiCommand<'_>) -> CoreResult<()> {
        self.fail()
    }
}

impl ParallelBus for Unwired {
    fn set_chip_enable(&mut self, _active: bool) -> CoreResult<()> {
        self.fail()
    }

    fn set_command_latch(&mut self, _active: bool) -> CoreResult<()> {
        self.fail()
    }

    fn set_address_latch(&mut self, _active: bool) -> CoreResult<()> {
        self.fail()
    }

    fn write_byte(&mut self, _byte: u8) -> CoreResult<()> {
        self.fail()
    }

    fn read_byte(&mut self) -> CoreResult<u8> {
        self.fail()
    }

    fn is_ready(&mut self) -> CoreResult<bool> {
        self.fail()
    }
}

impl I2cBus for Unwired {
    fn probe(&mut self, _addr: BusAddress) -> CoreResult<bool> {
        self.fail()
    }

    fn write(&mut self, _addr: BusAddress, _bytes: &[u8]) -> CoreResult<()> {
        self.fail()
    }

    fn read(&mut self, _addr: BusAddress, _buf: &mut [u8]) -> CoreResult<usize> {
        self.fail()
    }
}

/// Transports opened from one option string, one per memory technology
pub struct LinuxGpioTransports {
    /// Parallel NAND bus
    pub nand: Box<dyn ParallelBus>,
    /// SPI master for serial NOR
    pub spi: Box<dyn SpiMaster>,
    /// I2C bus for EEPROMs
    pub i2c: Box<dyn I2cBus>,
}

/// Open every bus wired in `options`
///
/// This is a convenience function for use in the CLI backend dispatch.
/// See [`parse_options`] for the accepted keys.
pub fn open_linux_gpio(
    options: &[(&str, &str)],
) -> std::result::Result<LinuxGpioTransports, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;

    let nand: Box<dyn ParallelBus> = match config.nand {
        Some(pins) => Box::new(LinuxGpioNand::open(&config, pins)?),
        None => Box::new(Unwired::new("NAND")),
    };
    let spi: Box<dyn SpiMaster> = match config.spi {
        Some(pins) => Box::new(LinuxGpioSpi::open(&config, pins)?),
        None => Box::new(Unwired::new("SPI")),
    };
    let i2c: Box<dyn I2cBus> = match config.i2c {
        Some(pins) => Box::new(LinuxGpioI2c::open(&config, pins)?),
        None => Box::new(Unwired::new("I2C")),
    };

    Ok(LinuxGpioTransports { nand, spi, i2c })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uniprog_core::spi::opcodes;

    #[test]
    fn test_unwired_fails_every_transfer() {
        let mut bus = Unwired::new("SPI");
        let mut id = [0u8; 3];
        let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut id);
        assert_eq!(bus.execute(&mut cmd), Err(CoreError::TransferFailed));

        let mut bus = Unwired::new("I2C");
        assert_eq!(
            I2cBus::probe(&mut bus, BusAddress::DEFAULT),
            Err(CoreError::TransferFailed)
        );

        let mut bus = Unwired::new("NAND");
        assert_eq!(bus.read_byte(), Err(CoreError::TransferFailed));
    }

    #[test]
    fn test_level() {
        assert_eq!(level(true), Value::Active);
        assert_eq!(level(false), Value::Inactive);
    }
}
