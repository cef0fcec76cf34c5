//! Parallel NAND bus bitbanged over GPIO lines
//!
//! The eight data lines switch direction on demand: outputs while writing
//! commands, addresses and data, inputs while RE# is pulsed.

use crate::config::{LinuxGpioConfig, NandPins};
use crate::error::{LinuxGpioError, Result};
use crate::{half_period, level};

use gpiocdev::line::Value;
use gpiocdev::request::{Config, Request};

use uniprog_core::error::Result as CoreResult;
use uniprog_core::programmer::ParallelBus;

/// Current levels of the control outputs
#[derive(Debug, Clone, Copy)]
struct Control {
    ce_high: bool,
    cle: bool,
    ale: bool,
}

/// Linux GPIO parallel NAND bus
pub struct LinuxGpioNand {
    request: Request,
    pins: NandPins,
    half_period_ns: u64,
    control: Control,
    data_output: bool,
}

impl LinuxGpioNand {
    /// Request the NAND lines described by `config`
    pub fn open(config: &LinuxGpioConfig, pins: NandPins) -> Result<Self> {
        log::debug!("linux_gpio: Opening NAND lines on {}", config.device);

        // Idle: CE# high, latches low, WE#/RE# high, data lines floating
        let control = Control {
            ce_high: true,
            cle: false,
            ale: false,
        };
        let request = Request::from_config(Self::line_config(&pins, control, false))
            .on_chip(&config.device)
            .with_consumer("uniprog-nand")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                bus: "NAND",
                source,
            })?;

        log::info!(
            "linux_gpio: NAND on {} (ce={}, cle={}, ale={}, we={}, re={}, rb={}, data={:?})",
            config.device,
            pins.ce,
            pins.cle,
            pins.ale,
            pins.we,
            pins.re,
            pins.rb,
            pins.data
        );

        Ok(Self {
            request,
            pins,
            half_period_ns: config.half_period_ns,
            control,
            data_output: false,
        })
    }

    fn line_config(pins: &NandPins, control: Control, data_output: bool) -> Config {
        let mut cfg = Config::default();
        cfg.with_line(pins.ce).as_output(level(control.ce_high));
        cfg.with_line(pins.cle).as_output(level(control.cle));
        cfg.with_line(pins.ale).as_output(level(control.ale));
        cfg.with_line(pins.we).as_output(Value::Active);
        cfg.with_line(pins.re).as_output(Value::Active);
        cfg.with_line(pins.rb).as_input();
        if let Some(wp) = pins.wp {
            cfg.with_line(wp).as_output(Value::Active);
        }
        for &line in &pins.data {
            if data_output {
                cfg.with_line(line).as_output(Value::Inactive);
            } else {
                cfg.with_line(line).as_input();
            }
        }
        cfg
    }

    fn set_data_direction(&mut self, output: bool) -> Result<()> {
        if self.data_output == output {
            return Ok(());
        }
        let cfg = Self::line_config(&self.pins, self.control, output);
        self.request
            .reconfigure(&cfg)
            .map_err(LinuxGpioError::ReconfigureFailed)?;
        self.data_output = output;
        Ok(())
    }

    fn set(&self, line: u32, high: bool) -> Result<()> {
        self.request
            .set_value(line, level(high))
            .map_err(LinuxGpioError::SetValueFailed)
    }

    fn get(&self, line: u32) -> Result<bool> {
        let value = self
            .request
            .value(line)
            .map_err(LinuxGpioError::GetValueFailed)?;
        Ok(value == Value::Active)
    }

    fn delay(&self) {
        half_period(self.half_period_ns);
    }
}

impl ParallelBus for LinuxGpioNand {
    fn set_chip_enable(&mut self, active: bool) -> CoreResult<()> {
        // CE# is active low
        self.set(self.pins.ce, !active)?;
        self.control.ce_high = !active;
        Ok(())
    }

    fn set_command_latch(&mut self, active: bool) -> CoreResult<()> {
        self.set(self.pins.cle, active)?;
        self.control.cle = active;
        Ok(())
    }

    fn set_address_latch(&mut self, active: bool) -> CoreResult<()> {
        self.set(self.pins.ale, active)?;
        self.control.ale = active;
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> CoreResult<()> {
        self.set_data_direction(true)?;
        for (bit, &line) in self.pins.data.iter().enumerate() {
            self.set(line, (byte >> bit) & 1 != 0)?;
        }
        // data is latched on the rising edge of WE#
        self.set(self.pins.we, false)?;
        self.delay();
        self.set(self.pins.we, true)?;
        self.delay();
        Ok(())
    }

    fn read_byte(&mut self) -> CoreResult<u8> {
        self.set_data_direction(false)?;
        self.set(self.pins.re, false)?;
        self.delay();
        let mut byte = 0u8;
        for (bit, &line) in self.pins.data.iter().enumerate() {
            if self.get(line)? {
                byte |= 1 << bit;
            }
        }
        self.set(self.pins.re, true)?;
        self.delay();
        Ok(byte)
    }

    fn is_ready(&mut self) -> CoreResult<bool> {
        Ok(self.get(self.pins.rb)?)
    }
}
