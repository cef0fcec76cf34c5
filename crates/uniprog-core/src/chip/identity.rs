//! Identification results

use super::jedec::{self, PartMatch};
use crate::config::BusAddress;
use core::fmt;

/// Number of bytes returned by the NAND READ ID command
pub const NAND_ID_LEN: usize = 5;

/// Number of valid 7-bit bus addresses (0x08..=0x77)
pub const MAX_BUS_DEVICES: usize = 0x70;

/// Raw NAND READ ID bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NandId {
    /// Manufacturer, device, then three extended ID bytes
    pub bytes: [u8; NAND_ID_LEN],
}

impl NandId {
    /// Manufacturer code
    pub const fn manufacturer(&self) -> u8 {
        self.bytes[0]
    }

    /// Device code
    pub const fn device(&self) -> u8 {
        self.bytes[1]
    }
}

/// JEDEC ID read from a serial NOR chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// Manufacturer ID
    pub manufacturer: u8,
    /// Device ID (memory type, capacity)
    pub device: u16,
}

impl JedecId {
    /// Vendor name, if known
    pub fn vendor(&self) -> Option<&'static str> {
        jedec::vendor_name(self.manufacturer)
    }

    /// Part lookup result
    pub fn part(&self) -> Option<PartMatch> {
        jedec::lookup(self.manufacturer, self.device)
    }
}

/// Devices that acknowledged during a bus scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusScan {
    /// Responding addresses in ascending order
    pub found: heapless::Vec<BusAddress, MAX_BUS_DEVICES>,
}

impl BusScan {
    /// True if nothing answered
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

/// Identity of whichever technology is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Parallel NAND ID bytes
    Nand(NandId),
    /// Serial NOR JEDEC ID
    SpiNor(JedecId),
    /// I2C bus scan
    Eeprom(BusScan),
}

impl fmt::Display for NandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LABELS: [&str; NAND_ID_LEN] = [
            "Manufacturer ID",
            "Device ID",
            "Third ID byte",
            "Fourth ID byte",
            "Fifth ID byte",
        ];
        for (i, (label, byte)) in LABELS.iter().zip(self.bytes.iter()).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}: 0x{:02X}", label, byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manufacturer ID: 0x{:02X}", self.manufacturer)?;
        writeln!(f, "Device ID: 0x{:04X}", self.device)?;
        f.write_str("Device: ")?;
        let Some(vendor) = self.vendor() else {
            return f.write_str("Unknown manufacturer");
        };
        f.write_str(vendor)?;
        match self.part() {
            Some(PartMatch::Known(part)) => {
                write!(f, " {} ({}Mbit)", part.name, part.capacity_mbit)
            }
            Some(PartMatch::UnknownSeries) => f.write_str(" Unknown W25Q series"),
            Some(PartMatch::UnknownModel) => f.write_str(" Unknown model"),
            Some(PartMatch::VendorOnly) | None => Ok(()),
        }
    }
}

impl fmt::Display for BusScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.found.is_empty() {
            return f.write_str("No I2C devices found!");
        }
        for (i, addr) in self.found.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "Device found at address {}", addr)?;
            if addr.is_eeprom_range() {
                f.write_str(" (likely EEPROM)")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nand(id) => id.fmt(f),
            Self::SpiNor(id) => id.fmt(f),
            Self::Eeprom(scan) => scan.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_jedec_display_known_part() {
        let id = JedecId {
            manufacturer: 0xEF,
            device: 0x4017,
        };
        let text = format!("{}", id);
        assert!(text.ends_with("Device: Winbond W25Q64 (64Mbit)"));
        assert!(text.starts_with("Manufacturer ID: 0xEF\nDevice ID: 0x4017\n"));
    }

    #[test]
    fn test_jedec_display_unknown() {
        let id = JedecId {
            manufacturer: 0x9D,
            device: 0x0000,
        };
        assert!(format!("{}", id).ends_with("Device: Unknown manufacturer"));

        let id = JedecId {
            manufacturer: 0xEF,
            device: 0x401F,
        };
        assert!(format!("{}", id).ends_with("Device: Winbond Unknown W25Q series"));
    }

    #[test]
    fn test_bus_scan_labels_eeprom_range() {
        let mut scan = BusScan::default();
        scan.found.push(BusAddress::new(0x3C).unwrap()).unwrap();
        scan.found.push(BusAddress::new(0x50).unwrap()).unwrap();

        assert_eq!(
            format!("{}", scan),
            "Device found at address 0x3C\nDevice found at address 0x50 (likely EEPROM)"
        );
        assert_eq!(format!("{}", BusScan::default()), "No I2C devices found!");
    }

    #[test]
    fn test_nand_id_display() {
        let id = NandId {
            bytes: [0xEC, 0x75, 0xA5, 0xBD, 0x00],
        };
        let text = format!("{}", id);
        assert!(text.starts_with("Manufacturer ID: 0xEC\nDevice ID: 0x75"));
        assert!(text.ends_with("Fifth ID byte: 0x00"));
    }
}
