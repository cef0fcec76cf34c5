//! SPI master bitbanged over GPIO lines
//!
//! Mode 0, single I/O. The byte-level clocking lives in
//! [`uniprog_core::programmer::bitbang::single`]; this type only drives the
//! lines.

use crate::config::{LinuxGpioConfig, SpiPins};
use crate::error::{LinuxGpioError, Result};
use crate::{half_period, level};

use gpiocdev::line::Value;
use gpiocdev::request::{Config, Request};

use uniprog_core::error::Result as CoreResult;
use uniprog_core::programmer::bitbang::{self, BitbangSpiMaster};
use uniprog_core::programmer::{default_execute, SpiMaster};
use uniprog_core::spi::SpiCommand;

/// Linux GPIO SPI programmer using bitbanging
pub struct LinuxGpioSpi {
    /// GPIO line request handle
    request: Request,
    pins: SpiPins,
    /// Half-period delay in nanoseconds
    half_period_ns: u64,
}

impl LinuxGpioSpi {
    /// Request the SPI lines described by `config`
    pub fn open(config: &LinuxGpioConfig, pins: SpiPins) -> Result<Self> {
        log::debug!("linux_gpio: Opening SPI lines on {}", config.device);

        // Initial state: CS=1 (high/inactive), SCK=0 (low), MOSI=0, MISO=input
        let mut req_config = Config::default();
        req_config.with_line(pins.cs).as_output(Value::Active);
        req_config.with_line(pins.sck).as_output(Value::Inactive);
        req_config.with_line(pins.mosi).as_output(Value::Inactive);
        req_config.with_line(pins.miso).as_input();

        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer("uniprog-spi")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed { bus: "SPI", source })?;

        log::info!(
            "linux_gpio: SPI on {} (cs={}, sck={}, mosi={}, miso={})",
            config.device,
            pins.cs,
            pins.sck,
            pins.mosi,
            pins.miso
        );

        Ok(Self {
            request,
            pins,
            half_period_ns: config.half_period_ns,
        })
    }

    fn drive(&self, line: u32, high: bool, name: &str) {
        if let Err(e) = self.request.set_value(line, level(high)) {
            log::error!("Failed to set {}: {}", name, e);
        }
    }
}

impl BitbangSpiMaster for LinuxGpioSpi {
    fn set_cs(&mut self, active: bool) {
        // CS is active low
        self.drive(self.pins.cs, !active, "CS");
    }

    fn set_sck(&mut self, high: bool) {
        self.drive(self.pins.sck, high, "SCK");
    }

    fn set_mosi(&mut self, high: bool) {
        self.drive(self.pins.mosi, high, "MOSI");
    }

    fn get_miso(&self) -> bool {
        match self.request.value(self.pins.miso) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(e) => {
                log::error!("Failed to get MISO: {}", e);
                false
            }
        }
    }

    fn half_period_delay(&self) {
        half_period(self.half_period_ns);
    }
}

impl SpiMaster for LinuxGpioSpi {
    fn max_read_len(&self) -> usize {
        // No hardware limit for bitbanging
        usize::MAX
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> CoreResult<()> {
        default_execute(cmd, |write_data, read_buf| {
            bitbang::single::transfer(self, write_data, read_buf);
            Ok(())
        })
    }
}
