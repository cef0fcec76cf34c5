//! Standard JEDEC SPI flash opcodes
//!
//! Only the subset issued by the serial NOR engine is listed.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status and identification
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read / program
// ============================================================================

/// Read Data (no dummy byte)
pub const READ: u8 = 0x03;
/// Fast Read (one dummy byte)
pub const FAST_READ: u8 = 0x0B;
/// Dummy clock cycles required by FAST_READ
pub const FAST_READ_DUMMY_CYCLES: u8 = 8;
/// Page Program with 3-byte address
pub const PP: u8 = 0x02;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase 4KB with 3-byte address
pub const SE_20: u8 = 0x20;
/// Block Erase 64KB with 3-byte address
pub const BE_D8: u8 = 0xD8;
/// Chip Erase (alternate opcode)
pub const CE_60: u8 = 0x60;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;

/// Sector size erased by SE_20
pub const SECTOR_SIZE: u32 = 4 * 1024;
/// Block size erased by BE_D8
pub const BLOCK_SIZE: u32 = 64 * 1024;

// ============================================================================
// Status register bit definitions
// ============================================================================

/// Status Register 1: Write In Progress / Busy
pub const SR1_WIP: u8 = 0x01;
