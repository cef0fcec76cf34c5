//! Recording transports for unit tests
//!
//! Each mock logs every bus-level action so tests can assert exact
//! sequences, and returns canned responses.

use crate::config::BusAddress;
use crate::error::{Error, Result};
use crate::poll::Clock;
use crate::programmer::{I2cBus, ParallelBus, SpiMaster};
use crate::spi::{opcodes, SpiCommand};
use core::cell::Cell;
use std::collections::VecDeque;
use std::vec::Vec;

/// Clock that only advances when delayed
#[derive(Default)]
pub struct TestClock {
    now: Cell<u64>,
}

impl TestClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for TestClock {
    fn now_us(&self) -> u64 {
        self.now.get()
    }

    fn delay_us(&self, us: u32) {
        self.now.set(self.now.get() + us as u64);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NandEvent {
    ChipEnable(bool),
    Command(u8),
    Address(u8),
    Write(u8),
    Read,
}

/// NAND bus that records strobes and replays queued read bytes
#[derive(Default)]
pub struct RecordingNand {
    pub events: Vec<NandEvent>,
    pub reads: VecDeque<u8>,
    pub stuck_busy: bool,
    cle: bool,
    ale: bool,
}

impl RecordingNand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reads(bytes: &[u8]) -> Self {
        Self {
            reads: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                NandEvent::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}

impl ParallelBus for RecordingNand {
    fn set_chip_enable(&mut self, active: bool) -> Result<()> {
        self.events.push(NandEvent::ChipEnable(active));
        Ok(())
    }

    fn set_command_latch(&mut self, active: bool) -> Result<()> {
        self.cle = active;
        Ok(())
    }

    fn set_address_latch(&mut self, active: bool) -> Result<()> {
        self.ale = active;
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        let event = if self.cle {
            NandEvent::Command(byte)
        } else if self.ale {
            NandEvent::Address(byte)
        } else {
            NandEvent::Write(byte)
        };
        self.events.push(event);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.events.push(NandEvent::Read);
        Ok(self.reads.pop_front().unwrap_or(0xFF))
    }

    fn is_ready(&mut self) -> Result<bool> {
        Ok(!self.stuck_busy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiRecord {
    pub opcode: u8,
    pub address: Option<u32>,
    pub dummy_cycles: u8,
    pub write_data: Vec<u8>,
    pub read_len: usize,
}

/// SPI master that records every frame and answers RDID/RDSR
pub struct RecordingSpi {
    pub frames: Vec<SpiRecord>,
    pub jedec: [u8; 3],
    pub status: u8,
    pub max_read: usize,
}

impl RecordingSpi {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            jedec: [0xEF, 0x40, 0x18],
            status: 0,
            max_read: 4096,
        }
    }

    /// Frames other than status polls
    pub fn non_poll_frames(&self) -> Vec<&SpiRecord> {
        self.frames
            .iter()
            .filter(|f| f.opcode != opcodes::RDSR)
            .collect()
    }
}

impl SpiMaster for RecordingSpi {
    fn max_read_len(&self) -> usize {
        self.max_read
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.frames.push(SpiRecord {
            opcode: cmd.opcode,
            address: cmd.address,
            dummy_cycles: cmd.dummy_cycles,
            write_data: cmd.write_data.to_vec(),
            read_len: cmd.read_buf.len(),
        });
        match cmd.opcode {
            opcodes::RDID => cmd.read_buf.copy_from_slice(&self.jedec[..cmd.read_buf.len()]),
            opcodes::RDSR => cmd.read_buf.fill(self.status),
            _ => cmd.read_buf.fill(0x5A),
        }
        Ok(())
    }
}

/// I2C bus with a fixed set of responding addresses
pub struct RecordingI2c {
    pub devices: Vec<u8>,
    pub probes: Vec<u8>,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: Vec<(u8, usize)>,
    /// Bytes delivered per read, `None` = as many as requested
    pub read_limit: Option<usize>,
    /// ACK address-only probes but NACK every write (internal write cycle)
    pub busy: bool,
}

impl RecordingI2c {
    pub fn with_devices(devices: &[u8]) -> Self {
        Self {
            devices: devices.to_vec(),
            probes: Vec::new(),
            writes: Vec::new(),
            reads: Vec::new(),
            read_limit: None,
            busy: false,
        }
    }

    fn acks(&self, addr: BusAddress) -> bool {
        self.devices.contains(&addr.get())
    }
}

impl I2cBus for RecordingI2c {
    fn probe(&mut self, addr: BusAddress) -> Result<bool> {
        self.probes.push(addr.get());
        Ok(self.acks(addr))
    }

    fn write(&mut self, addr: BusAddress, bytes: &[u8]) -> Result<()> {
        if !self.acks(addr) || self.busy {
            return Err(Error::BusNotResponding);
        }
        self.writes.push((addr.get(), bytes.to_vec()));
        Ok(())
    }

    fn read(&mut self, addr: BusAddress, buf: &mut [u8]) -> Result<usize> {
        if !self.acks(addr) {
            return Ok(0);
        }
        self.reads.push((addr.get(), buf.len()));
        let n = self.read_limit.unwrap_or(buf.len()).min(buf.len());
        buf[..n].fill(0xA5);
        Ok(n)
    }
}
