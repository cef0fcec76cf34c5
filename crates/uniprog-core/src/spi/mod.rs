//! SPI types and command structures
//!
//! This module provides the chip-select framed transaction type used by
//! [`SpiMaster`](crate::programmer::SpiMaster) and the JEDEC opcodes the
//! serial NOR engine issues.

mod address;
mod command;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::SpiCommand;
pub use opcodes::*;
