//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uniprog_core::engine::{EraseKind, Technology};

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        u32::from_str_radix(s, 16).map_err(|e| format!("Invalid hex value: {}", e))
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "uniprog")]
#[command(author, version, about = "NAND, SPI NOR and I2C EEPROM bench programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = "sim", help = backend_help())]
    pub backend: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Memory technology on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TechArg {
    /// Parallel NAND flash
    Nand,
    /// SPI NOR flash
    #[value(alias = "spi-nor")]
    Spi,
    /// I2C EEPROM
    #[value(alias = "i2c")]
    Eeprom,
}

impl From<TechArg> for Technology {
    fn from(t: TechArg) -> Self {
        match t {
            TechArg::Nand => Technology::Nand,
            TechArg::Spi => Technology::SerialNor,
            TechArg::Eeprom => Technology::AddressedEeprom,
        }
    }
}

/// Erase granularity on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EraseArg {
    Sector,
    Block,
    Chip,
}

impl From<EraseArg> for EraseKind {
    fn from(k: EraseArg) -> Self {
        match k {
            EraseArg::Sector => EraseKind::Sector,
            EraseArg::Block => EraseKind::Block,
            EraseArg::Chip => EraseKind::Chip,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive menu console (default)
    Console,

    /// Read the device ID
    Identify {
        #[arg(short, long)]
        tech: TechArg,
    },

    /// Read and hex-dump memory
    Read {
        #[arg(short, long)]
        tech: TechArg,

        /// Start address (hex)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Number of bytes (decimal)
        #[arg(short, long, default_value_t = 16)]
        length: usize,
    },

    /// Write hex bytes
    Write {
        #[arg(short, long)]
        tech: TechArg,

        /// Start address (hex)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Data bytes in hex, separated by spaces or commas
        #[arg(required = true, num_args = 1..)]
        bytes: Vec<String>,
    },

    /// Erase a sector, a block or the whole chip
    Erase {
        #[arg(short, long)]
        tech: TechArg,

        kind: EraseArg,

        /// Address inside the region to erase (hex)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Confirm a chip erase
        #[arg(long)]
        yes: bool,
    },

    /// Read the status register
    Status {
        #[arg(short, long)]
        tech: TechArg,
    },

    /// Scan the I2C bus for devices
    Scan,

    /// List available backends
    ListBackends,
}
