//! uniprog-core - Protocol engines for bench memory programming
//!
//! This crate drives three families of memory devices over bit-level
//! transports: parallel NAND flash, serial (SPI) NOR flash and addressed
//! (I2C) EEPROMs. It is `no_std` compatible so the same engines can run on
//! a microcontroller or on a host behind GPIO character devices.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc` and `serde`)
//! - `alloc` - Enable boxed transports and heap-backed helpers
//!
//! # Example
//!
//! ```ignore
//! use uniprog_core::engine::{MemoryEngine, SpiNorEngine};
//! use uniprog_core::poll::StdClock;
//!
//! fn dump<M: SpiMaster>(master: M) -> uniprog_core::Result<()> {
//!     let mut spi = SpiNorEngine::new(master, StdClock::new(), Default::default());
//!     println!("{}", spi.identify()?);
//!     let mut buf = [0u8; 64];
//!     spi.read_data(0, &mut buf)?;
//!     print!("{}", uniprog_core::hexdump::HexDump::new(&buf, 0));
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod config;
pub mod engine;
pub mod error;
pub mod hexdump;
pub mod poll;
pub mod programmer;
pub mod protocol;
pub mod session;
pub mod spi;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use session::Session;

/// Largest read a single command may request
pub const MAX_READ_LEN: usize = 256;
/// Largest number of bytes a single write command may carry
pub const MAX_WRITE_LEN: usize = 32;

/// Fixed-capacity buffer for one read command
pub type ReadBuffer = heapless::Vec<u8, MAX_READ_LEN>;
/// Fixed-capacity buffer for one write command
pub type WriteBuffer = heapless::Vec<u8, MAX_WRITE_LEN>;
