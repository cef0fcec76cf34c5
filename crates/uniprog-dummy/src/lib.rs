//! uniprog-dummy - Simulated memory chips for testing
//!
//! This crate provides in-memory models of a parallel NAND flash, a serial
//! NOR flash and a bus of I2C EEPROMs. They implement the core transport
//! traits directly, so the protocol engines can be exercised without real
//! hardware. Busy times are modelled against a shared [`SimClock`], which
//! only advances when the engines wait.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bench;
mod clock;
mod eeprom;
mod nand;
mod spi_flash;

pub use bench::Bench;
pub use clock::SimClock;
pub use eeprom::{DummyEeprom, DummyI2cBus, EepromModel};
pub use nand::{DummyNand, NandModel};
pub use spi_flash::{DummyConfig, DummySpiFlash};
