//! JEDEC manufacturer and part lookup for serial NOR flash
//!
//! Only the vendors and parts commonly found on a bench are listed. Unknown
//! IDs are never an error; they simply have no name.

/// Spansion / Cypress / Infineon
pub const MFR_SPANSION: u8 = 0x01;
/// Micron / ST
pub const MFR_MICRON: u8 = 0x20;
/// Winbond
pub const MFR_WINBOND: u8 = 0xEF;
/// Macronix
pub const MFR_MACRONIX: u8 = 0xC2;
/// SST / Microchip
pub const MFR_SST: u8 = 0xBF;

const VENDORS: &[(u8, &str)] = &[
    (MFR_SPANSION, "Spansion/Cypress"),
    (MFR_MICRON, "Micron/ST"),
    (MFR_WINBOND, "Winbond"),
    (MFR_MACRONIX, "Macronix"),
    (MFR_SST, "SST"),
];

/// Memory type byte of the Winbond W25Q family
const W25Q_MEMORY_TYPE: u8 = 0x40;

/// A serial NOR part recognised from its JEDEC ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownPart {
    /// Part family name
    pub name: &'static str,
    /// Capacity in megabits
    pub capacity_mbit: u32,
}

impl KnownPart {
    /// Capacity in bytes
    pub const fn capacity_bytes(&self) -> u32 {
        self.capacity_mbit * 1024 * 1024 / 8
    }
}

const W25Q_PARTS: &[(u8, KnownPart)] = &[
    (0x14, KnownPart { name: "W25Q80", capacity_mbit: 8 }),
    (0x15, KnownPart { name: "W25Q16", capacity_mbit: 16 }),
    (0x16, KnownPart { name: "W25Q32", capacity_mbit: 32 }),
    (0x17, KnownPart { name: "W25Q64", capacity_mbit: 64 }),
    (0x18, KnownPart { name: "W25Q128", capacity_mbit: 128 }),
];

/// What could be determined about the part behind a vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartMatch {
    /// Fully recognised
    Known(KnownPart),
    /// Vendor family recognised but capacity code is not
    UnknownSeries,
    /// Vendor recognised, device ID not in the table
    UnknownModel,
    /// No per-part table exists for this vendor
    VendorOnly,
}

/// Vendor name for a JEDEC manufacturer ID
pub fn vendor_name(manufacturer: u8) -> Option<&'static str> {
    VENDORS
        .iter()
        .find(|(id, _)| *id == manufacturer)
        .map(|(_, name)| *name)
}

/// Look up a part by manufacturer and 16-bit device ID
///
/// Returns `None` only when the manufacturer itself is unknown.
pub fn lookup(manufacturer: u8, device: u16) -> Option<PartMatch> {
    vendor_name(manufacturer)?;

    if manufacturer != MFR_WINBOND {
        return Some(PartMatch::VendorOnly);
    }

    let [memory_type, capacity] = device.to_be_bytes();
    if memory_type != W25Q_MEMORY_TYPE {
        return Some(PartMatch::UnknownModel);
    }

    Some(
        W25Q_PARTS
            .iter()
            .find(|(code, _)| *code == capacity)
            .map(|(_, part)| PartMatch::Known(*part))
            .unwrap_or(PartMatch::UnknownSeries),
    )
}
