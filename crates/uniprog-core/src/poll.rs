//! Bounded readiness polling
//!
//! Every "wait until the chip is done" in the engines goes through
//! [`await_ready`]. The wait is driven by an injectable [`Clock`], so the
//! same loop runs against wall-clock time on hardware and against a
//! simulated clock in tests.

use crate::error::Result;

/// Time source used for delays and timeout bookkeeping
///
/// Methods take `&self` so that one clock can be shared by several engines
/// (and by simulated devices) without exclusive borrows.
pub trait Clock {
    /// Monotonic time in microseconds since an arbitrary epoch
    fn now_us(&self) -> u64;

    /// Block for at least `us` microseconds
    fn delay_us(&self, us: u32);

    /// Block for at least `ms` milliseconds
    fn delay_ms(&self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }

    fn delay_us(&self, us: u32) {
        (**self).delay_us(us)
    }
}

#[cfg(feature = "alloc")]
impl<C: Clock + ?Sized> Clock for alloc::rc::Rc<C> {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }

    fn delay_us(&self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Wall-clock time source backed by `std::time::Instant`
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    epoch: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose epoch is now
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    fn delay_us(&self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// Sink for periodic progress reports during long waits and bulk operations
pub trait Progress {
    /// Called periodically while waiting; `elapsed_ms` counts from the start of the wait
    fn waiting(&mut self, elapsed_ms: u32);

    /// Called after a unit of a multi-step operation completes
    fn step(&mut self, done: usize, total: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn waiting(&mut self, _elapsed_ms: u32) {}
    fn step(&mut self, _done: usize, _total: usize) {}
}

/// Parameters for a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Give up after this many milliseconds
    pub timeout_ms: u32,
    /// Delay between two samples of the predicate
    pub interval_us: u32,
    /// Report progress this often (0 disables reporting)
    pub progress_interval_ms: u32,
}

impl PollPolicy {
    /// Policy with the given timeout, 100us sampling and no progress reports
    pub const fn with_timeout_ms(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            interval_us: 100,
            progress_interval_ms: 0,
        }
    }

    /// Set the sampling interval
    pub const fn interval_us(mut self, interval_us: u32) -> Self {
        self.interval_us = interval_us;
        self
    }

    /// Set the progress reporting interval
    pub const fn progress_every_ms(mut self, ms: u32) -> Self {
        self.progress_interval_ms = ms;
        self
    }
}

/// Outcome of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate returned true
    Ready,
    /// The timeout elapsed first
    TimedOut,
}

/// Sample `ready` until it returns true or `policy.timeout_ms` elapses
///
/// Errors returned by the predicate abort the wait and are propagated.
pub fn await_ready<C, F>(clock: &C, policy: &PollPolicy, ready: F) -> Result<PollOutcome>
where
    C: Clock + ?Sized,
    F: FnMut() -> Result<bool>,
{
    await_ready_reporting(clock, policy, ready, &mut NoProgress)
}

/// Same as [`await_ready`], calling `progress.waiting()` every
/// `policy.progress_interval_ms`
pub fn await_ready_reporting<C, F>(
    clock: &C,
    policy: &PollPolicy,
    mut ready: F,
    progress: &mut dyn Progress,
) -> Result<PollOutcome>
where
    C: Clock + ?Sized,
    F: FnMut() -> Result<bool>,
{
    let timeout_us = policy.timeout_ms as u64 * 1000;
    let report_us = policy.progress_interval_ms as u64 * 1000;
    // A zero interval would spin as fast as the bus allows; sample at least every 1us
    let interval_us = policy.interval_us.max(1);

    let start = clock.now_us();
    let mut next_report = report_us;

    loop {
        if ready()? {
            return Ok(PollOutcome::Ready);
        }

        let elapsed = clock.now_us().saturating_sub(start);
        if elapsed >= timeout_us {
            log::warn!(
                "device not ready after {} ms (limit {} ms)",
                elapsed / 1000,
                policy.timeout_ms
            );
            return Ok(PollOutcome::TimedOut);
        }

        if report_us > 0 && elapsed >= next_report {
            progress.waiting((elapsed / 1000) as u32);
            next_report = elapsed + report_us;
        }

        clock.delay_us(interval_us);
    }
}
