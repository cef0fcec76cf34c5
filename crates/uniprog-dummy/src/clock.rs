//! Simulated time source

use alloc::rc::Rc;
use core::cell::Cell;
use uniprog_core::poll::Clock;

/// Clock that only moves when someone delays on it
///
/// Clones share the same counter, so the engines and the simulated chips
/// observe one timeline.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<u64>>,
}

impl SimClock {
    /// Create a clock at t = 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without anyone waiting
    pub fn advance_us(&self, us: u64) {
        self.now.set(self.now.get() + us);
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u64 {
        self.now.get()
    }

    fn delay_us(&self, us: u32) {
        self.advance_us(us as u64);
    }
}
