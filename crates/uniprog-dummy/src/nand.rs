//! Simulated parallel NAND flash
//!
//! Models the CLE/ALE latch protocol: commands and address cycles are
//! collected as they are strobed in, and the page register is loaded or
//! committed on the confirm commands. Unwritten pages are not stored.

use crate::SimClock;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use uniprog_core::chip::NandStatus;
use uniprog_core::config::NandConfig;
use uniprog_core::error::Result;
use uniprog_core::poll::Clock;
use uniprog_core::programmer::ParallelBus;
use uniprog_core::protocol::nand::{
    CMD_ERASE, CMD_ERASE_CONFIRM, CMD_PROGRAM, CMD_PROGRAM_CONFIRM, CMD_READ, CMD_READ_CONFIRM,
    CMD_READ_ID, CMD_READ_STATUS, CMD_RESET,
};

/// Geometry, ID and timing of the simulated part
#[derive(Debug, Clone)]
pub struct NandModel {
    /// READ ID response
    pub id: [u8; 5],
    /// Bytes per page
    pub page_size: u32,
    /// Bytes per erase block
    pub block_size: u32,
    /// Number of erase blocks
    pub block_count: u32,
    /// tR
    pub read_busy_us: u64,
    /// tPROG
    pub program_busy_us: u64,
    /// tBERS
    pub erase_busy_us: u64,
    /// tRST
    pub reset_busy_us: u64,
}

impl NandModel {
    /// Model matching an engine configuration
    pub fn from_config(config: &NandConfig) -> Self {
        Self {
            page_size: config.page_size,
            block_size: config.block_size,
            block_count: config.block_count,
            ..Self::default()
        }
    }

    fn pages_per_block(&self) -> u32 {
        self.block_size / self.page_size
    }
}

impl Default for NandModel {
    fn default() -> Self {
        let config = NandConfig::default();
        Self {
            // Samsung K9F1G08
            id: [0xEC, 0xF1, 0x00, 0x95, 0x40],
            page_size: config.page_size,
            block_size: config.block_size,
            block_count: config.block_count,
            read_busy_us: 25,
            program_busy_us: 200,
            erase_busy_us: 2000,
            reset_busy_us: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    None,
    Id(usize),
    Status,
    Data,
}

/// Simulated NAND chip behind a [`ParallelBus`]
pub struct DummyNand {
    model: NandModel,
    clock: SimClock,
    pages: BTreeMap<u32, Vec<u8>>,
    chip_enabled: bool,
    cle: bool,
    ale: bool,
    last_cmd: Option<u8>,
    addr: Vec<u8>,
    column: usize,
    page: u32,
    register: Vec<u8>,
    output: Output,
    busy_until: u64,
    failed: bool,
    fail_next: bool,
    stuck_busy: bool,
    write_protected: bool,
}

impl DummyNand {
    /// Create an erased chip
    pub fn new(model: NandModel, clock: SimClock) -> Self {
        let register = vec![0xFF; model.page_size as usize];
        Self {
            model,
            clock,
            pages: BTreeMap::new(),
            chip_enabled: false,
            cle: false,
            ale: false,
            last_cmd: None,
            addr: Vec::new(),
            column: 0,
            page: 0,
            register,
            output: Output::None,
            busy_until: 0,
            failed: false,
            fail_next: false,
            stuck_busy: false,
            write_protected: false,
        }
    }

    /// The simulated geometry
    pub fn model(&self) -> &NandModel {
        &self.model
    }

    /// Byte at a linear address (0xFF if never programmed)
    pub fn byte_at(&self, addr: u32) -> u8 {
        let page = addr / self.model.page_size;
        let column = (addr % self.model.page_size) as usize;
        self.pages.get(&page).map_or(0xFF, |p| p[column])
    }

    /// Preload contents starting at a linear address
    pub fn load(&mut self, addr: u32, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            let a = addr + i as u32;
            let page = a / self.model.page_size;
            let column = (a % self.model.page_size) as usize;
            let size = self.model.page_size as usize;
            self.pages.entry(page).or_insert_with(|| vec![0xFF; size])[column] = b;
        }
    }

    /// Make the next program or erase report failure
    pub fn fail_next_operation(&mut self) {
        self.fail_next = true;
    }

    /// Hold R/B# low forever
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Emulate WP# asserted: program and erase fail
    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    /// Number of pages holding programmed data
    pub fn programmed_pages(&self) -> usize {
        self.pages.len()
    }

    fn ready(&self) -> bool {
        !self.stuck_busy && self.clock.now_us() >= self.busy_until
    }

    fn go_busy(&mut self, us: u64) {
        self.busy_until = self.clock.now_us() + us;
    }

    fn status(&self) -> u8 {
        let mut status = NandStatus::empty();
        status.set(NandStatus::FAIL, self.failed);
        status.set(NandStatus::READY, self.ready());
        status.set(NandStatus::WRITE_PROTECT, self.write_protected);
        status.bits()
    }

    fn latch_page_address(&mut self) {
        let a = &self.addr;
        self.column = (a[0] as usize) | ((a[1] as usize) << 8);
        self.page = (a[2] as u32) | ((a[3] as u32) << 8) | ((a[4] as u32) << 16);
        log::trace!("dummy nand: page {} column {}", self.page, self.column);
    }

    fn take_failure(&mut self) -> bool {
        let fail = self.fail_next || self.write_protected;
        self.fail_next = false;
        self.failed = fail;
        fail
    }

    fn command(&mut self, cmd: u8) {
        log::trace!("dummy nand: command 0x{:02X}", cmd);
        match cmd {
            CMD_RESET => {
                self.addr.clear();
                self.output = Output::None;
                self.last_cmd = None;
                self.go_busy(self.model.reset_busy_us);
                return;
            }
            CMD_READ_ID => {
                self.addr.clear();
                self.output = Output::Id(0);
            }
            CMD_READ_STATUS => {
                self.output = Output::Status;
                // status reads do not disturb a pending sequence
                return;
            }
            CMD_READ | CMD_ERASE => {
                self.addr.clear();
                self.output = Output::None;
            }
            CMD_PROGRAM => {
                self.addr.clear();
                self.output = Output::None;
                self.register.fill(0xFF);
            }
            CMD_READ_CONFIRM if self.last_cmd == Some(CMD_READ) => {
                match self.pages.get(&self.page) {
                    Some(data) => self.register.copy_from_slice(data),
                    None => self.register.fill(0xFF),
                }
                self.output = Output::Data;
                self.go_busy(self.model.read_busy_us);
            }
            CMD_PROGRAM_CONFIRM if self.last_cmd == Some(CMD_PROGRAM) => {
                if !self.take_failure() && self.page < self.total_pages() {
                    let size = self.model.page_size as usize;
                    let page = self.pages.entry(self.page).or_insert_with(|| vec![0xFF; size]);
                    // programming only clears bits
                    for (cell, &b) in page.iter_mut().zip(self.register.iter()) {
                        *cell &= b;
                    }
                }
                self.go_busy(self.model.program_busy_us);
            }
            CMD_ERASE_CONFIRM if self.last_cmd == Some(CMD_ERASE) && self.addr.len() >= 3 => {
                let a = &self.addr;
                let block = (a[0] as u32) | ((a[1] as u32) << 8) | ((a[2] as u32) << 16);
                if !self.take_failure() {
                    let ppb = self.model.pages_per_block();
                    let first = block * ppb;
                    self.pages.retain(|&p, _| p < first || p >= first + ppb);
                }
                self.go_busy(self.model.erase_busy_us);
            }
            _ => {
                log::warn!("dummy nand: unexpected command 0x{:02X}", cmd);
            }
        }
        self.last_cmd = Some(cmd);
    }

    fn total_pages(&self) -> u32 {
        self.model.block_count * self.model.pages_per_block()
    }
}

impl ParallelBus for DummyNand {
    fn set_chip_enable(&mut self, active: bool) -> Result<()> {
        self.chip_enabled = active;
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
        if !self.chip_enabled {
            return Ok(());
        }
        if self.cle {
            self.command(byte);
        } else if self.ale {
            self.addr.push(byte);
            if self.addr.len() == 5 && matches!(self.last_cmd, Some(CMD_READ | CMD_PROGRAM)) {
                self.latch_page_address();
            }
        } else if self.last_cmd == Some(CMD_PROGRAM) {
            if let Some(cell) = self.register.get_mut(self.column) {
                *cell = byte;
            }
            self.column += 1;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        if !self.chip_enabled {
            return Ok(0xFF);
        }
        let byte = match self.output {
            Output::None => 0xFF,
            Output::Status => self.status(),
            Output::Id(i) => {
                self.output = Output::Id(i + 1);
                self.model.id.get(i).copied().unwrap_or(0x00)
            }
            Output::Data => {
                let b = self.register.get(self.column).copied().unwrap_or(0xFF);
                self.column += 1;
                b
            }
        };
        Ok(byte)
    }

    fn is_ready(&mut self) -> Result<bool> {
        Ok(self.ready())
    }
}
