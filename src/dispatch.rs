//! Command dispatcher
//!
//! Turns typed commands into session and engine calls and renders the
//! results as text. Input limits (read clamp, write truncation, chip erase
//! confirmation) are enforced here, before any engine is touched.

use crate::config::ConsoleConfig;
use crate::error::CliError;
use crate::progress;
use std::io::Write;
use uniprog_core::config::BusAddress;
use uniprog_core::engine::{EraseKind, Technology};
use uniprog_core::hexdump::HexDump;
use uniprog_core::poll::{Clock, NoProgress, Progress};
use uniprog_core::programmer::{I2cBus, ParallelBus, SpiMaster};
use uniprog_core::{Error, ReadBuffer, Session, WriteBuffer};

/// One console or CLI request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Make a technology active
    SelectTechnology(Technology),
    /// Identify the device (bus scan for EEPROMs)
    Identify,
    /// Read and hex-dump `length` bytes
    ReadData { address: u32, length: usize },
    /// Write bytes starting at `address`
    WriteData { address: u32, bytes: WriteBuffer },
    /// Erase; chip erase only runs when `confirmed`
    Erase {
        kind: EraseKind,
        address: u32,
        confirmed: bool,
    },
    /// Show the device status
    ReadStatus,
    /// Change the EEPROM device address (raw, validated on dispatch)
    SetBusDeviceAddress(u32),
    /// Print the command menu
    Help,
    /// Leave the console
    Quit,
}

/// What the caller should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse a hex number the way `strtoul(s, NULL, 16)` does
///
/// Leading whitespace and an optional `0x` prefix are skipped, parsing stops
/// at the first non-hex character, and overflow saturates. No digits at all
/// yields 0 with a warning.
pub fn parse_hex(s: &str) -> u32 {
    let s = s.trim_start();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    lenient(s, digits, 16)
}

/// Parse a decimal number leniently (leading digits only)
pub fn parse_dec(s: &str) -> u32 {
    let s = s.trim_start();
    lenient(s, s.strip_prefix('+').unwrap_or(s), 10)
}

fn lenient(input: &str, digits: &str, radix: u32) -> u32 {
    let mut value: u32 = 0;
    let mut any = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else { break };
        any = true;
        value = value.saturating_mul(radix).saturating_add(d);
    }
    if !any {
        log::warn!("No number in {:?}, using 0", input.trim());
    }
    value
}

/// Parse hex byte tokens separated by spaces or commas
///
/// At most `max` bytes are kept (never more than a [`WriteBuffer`] holds);
/// the second value tells whether tokens were dropped.
pub fn parse_bytes(input: &str, max: usize) -> (WriteBuffer, bool) {
    let mut bytes = WriteBuffer::new();
    let max = max.min(bytes.capacity());
    let mut truncated = false;
    for token in input.split([' ', ',', '\t']).filter(|t| !t.is_empty()) {
        if bytes.len() == max {
            truncated = true;
            break;
        }
        // strtol semantics: only the low byte is kept
        let _ = bytes.push(parse_hex(token) as u8);
    }
    (bytes, truncated)
}

/// The command menu
pub const MENU: &str = "\
==== COMMANDS ====
1: Set NAND Flash mode
2: Set SPI Flash mode
3: Set I2C EEPROM mode
i: Read device ID
r: Read data
w: Write data
e: Erase
s: Read status
a: Set I2C address (EEPROM mode)
h: Show this menu
q: Quit
";

fn no_progress() -> Box<dyn Progress> {
    Box::new(NoProgress)
}

/// Owns the session and executes commands against it
pub struct Dispatcher<P, M, B, C> {
    session: Session<P, M, B, C>,
    limits: ConsoleConfig,
    progress: fn() -> Box<dyn Progress>,
}

impl<P, M, B, C> Dispatcher<P, M, B, C>
where
    P: ParallelBus,
    M: SpiMaster,
    B: I2cBus,
    C: Clock,
{
    /// Dispatcher without progress display
    pub fn new(session: Session<P, M, B, C>, limits: ConsoleConfig) -> Self {
        Self {
            session,
            limits,
            progress: no_progress,
        }
    }

    /// Show indicatif progress during erases
    pub fn with_progress_display(mut self) -> Self {
        self.progress = progress::erase_progress;
        self
    }

    /// Input limits in effect
    pub fn limits(&self) -> &ConsoleConfig {
        &self.limits
    }

    /// The underlying session
    pub fn session(&mut self) -> &mut Session<P, M, B, C> {
        &mut self.session
    }

    /// Run one command, writing its output to `out`
    pub fn execute(&mut self, command: Command, out: &mut dyn Write) -> Result<Flow, CliError> {
        log::debug!("Dispatching {:?}", command);
        match command {
            Command::SelectTechnology(tech) => {
                let result = self.session.select(tech);
                writeln!(out, "{} mode selected", tech)?;
                if tech == Technology::AddressedEeprom {
                    writeln!(out, "Current I2C address: {}", self.session.bus_address())?;
                }
                result?;
            }
            Command::Identify => {
                let engine = self.session.engine()?;
                if engine.technology() == Technology::AddressedEeprom {
                    writeln!(out, "Scanning I2C bus for devices...")?;
                } else {
                    writeln!(out, "Reading device ID...")?;
                }
                let identity = engine.identify()?;
                writeln!(out, "{}", identity)?;
            }
            Command::ReadData { address, length } => {
                let engine = self.session.engine()?;
                let length = if length > self.limits.max_read {
                    writeln!(out, "Warning: Limiting to {} bytes", self.limits.max_read)?;
                    self.limits.max_read
                } else {
                    length
                };
                writeln!(out, "Reading {} bytes from address 0x{:X}", length, address)?;

                let mut buf = ReadBuffer::new();
                buf.resize_default(length)
                    .map_err(|_| CliError::Device(Error::InvalidAddressOrLength))?;
                engine.read_data(address, &mut buf)?;
                write!(out, "{}", HexDump::new(&buf, address))?;
            }
            Command::WriteData { address, bytes } => {
                let engine = self.session.engine()?;
                writeln!(out, "Writing {} bytes to address 0x{:X}", bytes.len(), address)?;
                engine.write_data(address, &bytes)?;
                writeln!(out, "Write complete")?;
            }
            Command::Erase {
                kind,
                address,
                confirmed,
            } => {
                let engine = self.session.engine()?;
                match kind {
                    EraseKind::Sector => writeln!(out, "Erasing sector at 0x{:X}", address)?,
                    EraseKind::Block => writeln!(out, "Erasing block at 0x{:X}", address)?,
                    EraseKind::Chip if !confirmed => {
                        writeln!(out, "Erase aborted!")?;
                        return Ok(Flow::Continue);
                    }
                    EraseKind::Chip => writeln!(out, "Erasing entire chip...")?,
                }
                let mut progress = (self.progress)();
                engine.erase(kind, address, progress.as_mut())?;
                drop(progress);
                writeln!(out, "Erase complete")?;
            }
            Command::ReadStatus => {
                let engine = self.session.engine()?;
                writeln!(out, "Reading status register...")?;
                let status = engine.read_status()?;
                writeln!(out, "{}", status)?;
            }
            Command::SetBusDeviceAddress(raw) => {
                let addr = u8::try_from(raw)
                    .map_err(|_| Error::InvalidInput)
                    .and_then(BusAddress::new)
                    .inspect_err(|_| {
                        log::warn!("Invalid I2C address 0x{:X}! Valid range is 0x08-0x77", raw)
                    })?;
                self.session.set_bus_address(addr);
                writeln!(out, "I2C address set to {}", addr)?;
            }
            Command::Help => write!(out, "{}", MENU)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}
