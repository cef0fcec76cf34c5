//! Transport traits and abstractions
//!
//! This module defines the three bus abstractions the protocol engines are
//! written against: a byte-wide NAND bus, a chip-select framed SPI master
//! and an addressed I2C bus.

pub mod bitbang;
mod traits;

pub use bitbang::{BitbangI2c, BitbangSpiMaster};
pub use traits::*;
