//! Progress reporting with indicatif
//!
//! Long waits (NOR erases) show a spinner with the elapsed time, bulk
//! operations (NAND chip erase, EEPROM fill) show a bar.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use uniprog_core::poll::Progress;

/// Create a standard progress bar style
fn create_progress_bar_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("#>-"))
}

/// Create a standard spinner style
fn create_spinner_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?)
}

/// Progress reporter using indicatif progress bars
///
/// The bar or spinner is created on the first report and cleared when the
/// reporter is dropped.
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
    message: &'static str,
}

impl IndicatifProgress {
    pub fn new(message: &'static str) -> Self {
        Self {
            current_bar: None,
            message,
        }
    }

    fn bar(&mut self, total: u64) -> &ProgressBar {
        let message = self.message;
        self.current_bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(total);
            pb.set_style(create_progress_bar_style().unwrap_or_else(|_| ProgressStyle::default_bar()));
            pb.set_message(message);
            pb
        })
    }

    fn spinner(&mut self) -> &ProgressBar {
        let message = self.message;
        self.current_bar.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(create_spinner_style().unwrap_or_else(|_| ProgressStyle::default_spinner()));
            pb.set_message(message);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        })
    }
}

impl Progress for IndicatifProgress {
    fn waiting(&mut self, elapsed_ms: u32) {
        let message = self.message;
        self.spinner()
            .set_message(format!("{} ({:.1}s)", message, elapsed_ms as f32 / 1000.0));
    }

    fn step(&mut self, done: usize, total: usize) {
        self.bar(total as u64).set_position(done as u64);
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Build a boxed reporter for an erase
pub fn erase_progress() -> Box<dyn Progress> {
    Box::new(IndicatifProgress::new("Erasing"))
}
