//! Chip identification and status register types
//!
//! Each technology reports identity and status differently; the types here
//! carry the raw values plus a human-readable rendering.

mod identity;
pub mod jedec;
mod status;

pub use identity::{BusScan, Identity, JedecId, NandId};
pub use status::{EepromStatus, NandStatus, SpiStatus, Status};
