//! Protocol implementations
//!
//! Stateless command sequences for each bus. The engines in
//! [`crate::engine`] compose these into complete operations with
//! geometry checks, waits and status interpretation.

pub mod i2c_eeprom;
pub mod nand;
pub mod spi25;
