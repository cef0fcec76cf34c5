//! I2C master bitbanged over GPIO lines
//!
//! SDA is emulated open-drain: releasing it turns the line into an input
//! and the external pull-up takes it high, driving it low makes it an
//! output at 0. SCL is push-pull, so clock stretching is not supported.

use crate::config::{I2cPins, LinuxGpioConfig};
use crate::error::{LinuxGpioError, Result};
use crate::{half_period, level};

use gpiocdev::line::Value;
use gpiocdev::request::{Config, Request};

use uniprog_core::config::BusAddress;
use uniprog_core::error::{Error, Result as CoreResult};
use uniprog_core::programmer::bitbang::{self, BitbangI2c};
use uniprog_core::programmer::I2cBus;

/// Linux GPIO I2C master using bitbanging
pub struct LinuxGpioI2c {
    request: Request,
    pins: I2cPins,
    half_period_ns: u64,
    scl_high: bool,
    sda_released: bool,
}

impl LinuxGpioI2c {
    /// Request the I2C lines described by `config`
    pub fn open(config: &LinuxGpioConfig, pins: I2cPins) -> Result<Self> {
        log::debug!("linux_gpio: Opening I2C lines on {}", config.device);

        // Idle bus: SCL high, SDA released
        let request = Request::from_config(Self::line_config(pins, true, true))
            .on_chip(&config.device)
            .with_consumer("uniprog-i2c")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed { bus: "I2C", source })?;

        log::info!(
            "linux_gpio: I2C on {} (scl={}, sda={})",
            config.device,
            pins.scl,
            pins.sda
        );

        Ok(Self {
            request,
            pins,
            half_period_ns: config.half_period_ns,
            scl_high: true,
            sda_released: true,
        })
    }

    fn line_config(pins: I2cPins, scl_high: bool, sda_released: bool) -> Config {
        let mut cfg = Config::default();
        cfg.with_line(pins.scl).as_output(level(scl_high));
        if sda_released {
            cfg.with_line(pins.sda).as_input();
        } else {
            cfg.with_line(pins.sda).as_output(Value::Inactive);
        }
        cfg
    }
}

impl BitbangI2c for LinuxGpioI2c {
    fn set_scl(&mut self, high: bool) {
        if let Err(e) = self.request.set_value(self.pins.scl, level(high)) {
            log::error!("Failed to set SCL: {}", e);
        }
        self.scl_high = high;
    }

    fn set_sda(&mut self, high: bool) {
        if high == self.sda_released {
            return;
        }
        let cfg = Self::line_config(self.pins, self.scl_high, high);
        if let Err(e) = self.request.reconfigure(&cfg) {
            log::error!("{}", LinuxGpioError::ReconfigureFailed(e));
        }
        self.sda_released = high;
    }

    fn get_sda(&self) -> bool {
        match self.request.value(self.pins.sda) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(e) => {
                log::error!("{}", LinuxGpioError::GetValueFailed(e));
                // a dead line reads as NACK
                true
            }
        }
    }

    fn half_period_delay(&self) {
        half_period(self.half_period_ns);
    }
}

impl I2cBus for LinuxGpioI2c {
    fn probe(&mut self, addr: BusAddress) -> CoreResult<bool> {
        Ok(bitbang::i2c::write_transaction(self, addr, &[]))
    }

    fn write(&mut self, addr: BusAddress, bytes: &[u8]) -> CoreResult<()> {
        if bitbang::i2c::write_transaction(self, addr, bytes) {
            Ok(())
        } else {
            log::debug!("linux_gpio: NACK from {}", addr);
            Err(Error::BusNotResponding)
        }
    }

    fn read(&mut self, addr: BusAddress, buf: &mut [u8]) -> CoreResult<usize> {
        Ok(bitbang::i2c::read_transaction(self, addr, buf))
    }
}
