//! Pin assignment and option parsing
//!
//! One option string wires up any subset of the three buses on a single
//! GPIO chip. A bus is enabled when all of its required pins are given.

use crate::error::{LinuxGpioError, Result};
use gpiocdev::line::Offset;
use std::collections::{HashMap, HashSet};

/// Default half-period delay in nanoseconds (for ~100 kHz bus clock)
pub const DEFAULT_HALF_PERIOD_NS: u64 = 5000;

/// SPI wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiPins {
    /// Chip select (active low)
    pub cs: Offset,
    /// Serial clock
    pub sck: Offset,
    /// Master out
    pub mosi: Offset,
    /// Master in
    pub miso: Offset,
}

/// I2C wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cPins {
    /// Clock
    pub scl: Offset,
    /// Data
    pub sda: Offset,
}

/// Parallel NAND wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NandPins {
    /// Chip enable (active low)
    pub ce: Offset,
    /// Command latch enable
    pub cle: Offset,
    /// Address latch enable
    pub ale: Offset,
    /// Write enable (active low)
    pub we: Offset,
    /// Read enable (active low)
    pub re: Offset,
    /// Ready/busy (input, low = busy)
    pub rb: Offset,
    /// Data lines D0..D7
    pub data: [Offset; 8],
    /// Write protect (active low), driven high when given
    pub wp: Option<Offset>,
}

/// Configuration for opening Linux GPIO transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxGpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// Half-period delay in nanoseconds
    pub half_period_ns: u64,
    /// SPI pins, if wired
    pub spi: Option<SpiPins>,
    /// I2C pins, if wired
    pub i2c: Option<I2cPins>,
    /// NAND pins, if wired
    pub nand: Option<NandPins>,
}

impl Default for LinuxGpioConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            half_period_ns: DEFAULT_HALF_PERIOD_NS,
            spi: None,
            i2c: None,
            nand: None,
        }
    }
}

impl LinuxGpioConfig {
    /// Set bus speed in Hz (approximate, via half-period calculation)
    pub fn with_speed_hz(mut self, hz: u32) -> Self {
        // half_period = 1 / (2 * frequency) in seconds
        if hz > 0 {
            self.half_period_ns = 500_000_000 / hz as u64;
        }
        self
    }

    /// Check that no line is used twice
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        let mut seen = HashSet::new();
        for line in self.lines() {
            if !seen.insert(line) {
                return Err(LinuxGpioError::DuplicateLine(line));
            }
        }
        Ok(())
    }

    fn lines(&self) -> Vec<Offset> {
        let mut lines = Vec::new();
        if let Some(p) = &self.spi {
            lines.extend([p.cs, p.sck, p.mosi, p.miso]);
        }
        if let Some(p) = &self.i2c {
            lines.extend([p.scl, p.sda]);
        }
        if let Some(p) = &self.nand {
            lines.extend([p.ce, p.cle, p.ale, p.we, p.re, p.rb]);
            lines.extend(p.data);
            lines.extend(p.wp);
        }
        lines
    }
}

/// Collects named pins, then assembles each bus from them
#[derive(Default)]
struct Pins {
    named: HashMap<&'static str, Offset>,
}

impl Pins {
    fn set(&mut self, name: &'static str, value: &str) -> std::result::Result<(), String> {
        let offset = value
            .parse()
            .map_err(|_| format!("Invalid {} value: {}", name, value))?;
        self.named.insert(name, offset);
        Ok(())
    }

    /// All of `names`, none of them, or an error naming the gaps
    fn group<const N: usize>(
        &self,
        bus: &'static str,
        names: [&'static str; N],
    ) -> std::result::Result<Option<[Offset; N]>, String> {
        let found: Vec<_> = names.iter().filter_map(|n| self.named.get(n)).collect();
        if found.is_empty() {
            return Ok(None);
        }
        if found.len() < N {
            let missing: Vec<_> = names
                .iter()
                .filter(|n| !self.named.contains_key(*n))
                .copied()
                .collect();
            return Err(LinuxGpioError::IncompleteBus {
                bus,
                missing: missing.join(", "),
            }
            .to_string());
        }
        Ok(Some(names.map(|n| self.named[n])))
    }
}

const SPI_PINS: [&str; 4] = ["cs", "sck", "mosi", "miso"];
const I2C_PINS: [&str; 2] = ["scl", "sda"];
const NAND_CONTROL_PINS: [&str; 6] = ["ce", "cle", "ale", "we", "re", "rb"];
const NAND_DATA_PINS: [&str; 8] = ["d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7"];

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `cs`, `sck`, `mosi` (`io0`), `miso` (`io1`) - SPI lines
/// - `scl`, `sda` - I2C lines
/// - `ce`, `cle`, `ale`, `we`, `re`, `rb`, `d0`..`d7` - NAND lines
/// - `data=N` - NAND D0..D7 on eight consecutive lines starting at N
/// - `wp=N` - NAND WP# line, held high (optional)
/// - `speed=N` or `spispeed=N` - bus speed in kHz (optional, default ~100 kHz)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxGpioConfig, String> {
    let mut config = LinuxGpioConfig::default();
    let mut pins = Pins::default();
    let mut gpiochip: Option<u32> = None;
    let mut wp: Option<Offset> = None;

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid gpiochip value: {}", value))?,
                );
            }
            "mosi" | "io0" => pins.set("mosi", value)?,
            "miso" | "io1" => pins.set("miso", value)?,
            "data" => {
                let base: Offset = value
                    .parse()
                    .map_err(|_| format!("Invalid data value: {}", value))?;
                for (i, name) in NAND_DATA_PINS.iter().enumerate() {
                    pins.named.insert(*name, base + i as Offset);
                }
            }
            "wp" => {
                wp = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid wp value: {}", value))?,
                );
            }
            "speed" | "spispeed" => {
                let speed_khz: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid {} value: {}", key, value))?;
                config = config.with_speed_hz(speed_khz * 1000);
            }
            other => {
                let known = SPI_PINS
                    .iter()
                    .chain(&I2C_PINS)
                    .chain(&NAND_CONTROL_PINS)
                    .chain(&NAND_DATA_PINS)
                    .find(|n| **n == other);
                match known {
                    Some(name) => pins.set(*name, value)?,
                    None => log::warn!("linux_gpio: Unknown option: {}={}", key, value),
                }
            }
        }
    }

    // Handle dev vs gpiochip
    if config.device.is_empty() {
        if let Some(n) = gpiochip {
            if n > 9 {
                return Err("Maximum gpiochip number supported is 9".to_string());
            }
            config.device = format!("/dev/gpiochip{}", n);
        } else {
            return Err("Either 'dev' or 'gpiochip' must be specified.\n\
                 e.g. linux_gpio:dev=/dev/gpiochip0,cs=25,sck=11,mosi=10,miso=9"
                .to_string());
        }
    } else if gpiochip.is_some() {
        return Err("Only one of 'dev' or 'gpiochip' can be specified".to_string());
    }

    config.spi = pins.group("SPI", SPI_PINS)?.map(|[cs, sck, mosi, miso]| SpiPins {
        cs,
        sck,
        mosi,
        miso,
    });
    config.i2c = pins
        .group("I2C", I2C_PINS)?
        .map(|[scl, sda]| I2cPins { scl, sda });

    let control = pins.group("NAND", NAND_CONTROL_PINS)?;
    let data = pins.group("NAND", NAND_DATA_PINS)?;
    config.nand = match (control, data) {
        (Some([ce, cle, ale, we, re, rb]), Some(data)) => Some(NandPins {
            ce,
            cle,
            ale,
            we,
            re,
            rb,
            data,
            wp,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err("Incomplete NAND wiring, missing: d0..d7 (or data=N)".into());
        }
        (None, Some(_)) => {
            return Err("Incomplete NAND wiring, missing: ce, cle, ale, we, re, rb".into());
        }
    };

    if config.spi.is_none() && config.i2c.is_none() && config.nand.is_none() {
        return Err("No bus wired: give SPI, I2C or NAND pins".to_string());
    }
    config.validate().map_err(|e| e.to_string())?;

    Ok(config)
}
