//! TOML configuration file
//!
//! Every section and key is optional:
//!
//! ```toml
//! [nand]
//! page_size = 512
//! block_size = 16384
//! block_count = 2048
//! ready_timeout_ms = 1000
//!
//! [spi_nor]
//! page_size = 256
//! chip_erase_timeout_ms = 200000
//!
//! [eeprom]
//! page_size = 8
//! write_cycle_ms = 5
//! chip_size = 32768
//! address_mode = "auto"   # auto | one-byte | two-byte
//! bus_address = 0x50
//!
//! [console]
//! max_read = 256
//! max_write = 32
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use uniprog_core::config::{EepromConfig, NandConfig, SpiNorConfig};
use uniprog_core::protocol::i2c_eeprom::MAX_PAGE_SIZE;
use uniprog_core::{MAX_READ_LEN, MAX_WRITE_LEN};

/// Limits applied to console input before any engine call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Longest read the console accepts; longer requests are clamped
    pub max_read: usize,
    /// Most bytes one write command takes; extra tokens are dropped
    pub max_write: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_read: MAX_READ_LEN,
            max_write: MAX_WRITE_LEN,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Parallel NAND geometry and timing
    pub nand: NandConfig,
    /// Serial NOR geometry and timing
    pub spi_nor: SpiNorConfig,
    /// I2C EEPROM geometry, timing and device address
    pub eeprom: EepromConfig,
    /// Console input limits
    pub console: ConsoleConfig,
}

impl Config {
    /// Load from `path`, or return defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let config = Self::from_toml_file(path)?;
                log::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate a configuration file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_len("console.max_read", self.console.max_read, MAX_READ_LEN)?;
        check_len("console.max_write", self.console.max_write, MAX_WRITE_LEN)?;
        check("eeprom.page_size", self.eeprom.page_size, 1, MAX_PAGE_SIZE as u32)?;
        check("eeprom.chip_size", self.eeprom.chip_size, 1, 0x1_0000)?;
        check("spi_nor.page_size", self.spi_nor.page_size, 1, 4096)?;

        let nand = &self.nand;
        check("nand.page_size", nand.page_size, 1, u32::MAX)?;
        check("nand.block_size", nand.block_size, nand.page_size, u32::MAX)?;
        if nand.block_size % nand.page_size != 0 {
            return Err(ConfigError::Inconsistent {
                key: "nand.block_size",
                reason: "must be a multiple of nand.page_size",
            });
        }
        // block_count * block_size must stay addressable with u32
        check("nand.block_count", nand.block_count, 1, u32::MAX / nand.block_size)?;
        Ok(())
    }
}

fn check_len(key: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    let value = u32::try_from(value).map_err(|_| ConfigError::Inconsistent {
        key,
        reason: "value does not fit in 32 bits",
    })?;
    check(key, value, 1, max as u32)
}

fn check(key: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            min,
            max,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uniprog_core::config::{AddressMode, BusAddress};

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
            [nand]
            block_count = 1024

            [spi_nor]
            chip_erase_timeout_ms = 60000

            [eeprom]
            page_size = 64
            address_mode = "two-byte"
            bus_address = 0x51

            [console]
            max_read = 128
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.nand.block_count, 1024);
        assert_eq!(config.nand.page_size, 512);
        assert_eq!(config.spi_nor.chip_erase_timeout_ms, 60_000);
        assert_eq!(config.spi_nor.sector_erase_timeout_ms, 1000);
        assert_eq!(config.eeprom.page_size, 64);
        assert_eq!(config.eeprom.address_mode, AddressMode::TwoByte);
        assert_eq!(config.eeprom.bus_address, BusAddress::new(0x51).unwrap());
        assert_eq!(config.console.max_read, 128);
        assert_eq!(config.console.max_write, 32);
    }

    #[test]
    fn test_reserved_bus_address_is_rejected() {
        let err = Config::from_toml_str("[eeprom]\nbus_address = 0x78\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_limits_are_checked() {
        let err = Config::from_toml_str("[console]\nmax_read = 1024\n").unwrap_err();
        assert!(err.to_string().contains("console.max_read"), "{}", err);

        let err = Config::from_toml_str("[eeprom]\npage_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("eeprom.page_size"), "{}", err);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(Config::from_toml_str("[console]\nmax_reads = 16\n").is_err());
    }

    #[test]
    fn test_nand_geometry_is_checked() {
        let cases = [
            ("[nand]\nblock_size = 0\npage_size = 1\n", "nand.block_size"),
            ("[nand]\npage_size = 0\n", "nand.page_size"),
            ("[nand]\nblock_count = 0\n", "nand.block_count"),
            ("[nand]\nblock_size = 1000\n", "nand.block_size"),
            ("[nand]\nblock_size = 16384\nblock_count = 262144\n", "nand.block_count"),
        ];
        for (toml, key) in cases {
            let err = Config::from_toml_str(toml).unwrap_err();
            assert!(err.to_string().contains(key), "{}: {}", toml, err);
        }

        // the largest geometry that still fits
        let config = Config::from_toml_str("[nand]\nblock_size = 16384\nblock_count = 262143\n")
            .unwrap();
        assert_eq!(config.nand.block_count, 262_143);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_console_limit_is_rejected() {
        let err = Config::from_toml_str("[console]\nmax_write = 4294967296\n").unwrap_err();
        assert!(err.to_string().contains("console.max_write"), "{}", err);
    }
}
