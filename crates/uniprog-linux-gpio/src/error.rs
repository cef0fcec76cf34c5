//! Error types for Linux GPIO bitbang transports

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request {bus} GPIO lines: {source}")]
    LineRequestFailed {
        bus: &'static str,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to set GPIO line value
    #[error("Failed to set GPIO line value: {0}")]
    SetValueFailed(#[source] gpiocdev::Error),

    /// Failed to get GPIO line value
    #[error("Failed to get GPIO line value: {0}")]
    GetValueFailed(#[source] gpiocdev::Error),

    /// Failed to reconfigure GPIO lines
    #[error("Failed to reconfigure GPIO lines: {0}")]
    ReconfigureFailed(#[source] gpiocdev::Error),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// Some but not all pins of a bus were given
    #[error("Incomplete {bus} wiring, missing: {missing}")]
    IncompleteBus { bus: &'static str, missing: String },

    /// The same line was assigned twice
    #[error("GPIO line {0} assigned to more than one signal")]
    DuplicateLine(u32),
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;

impl From<LinuxGpioError> for uniprog_core::Error {
    fn from(e: LinuxGpioError) -> Self {
        log::error!("linux_gpio: {}", e);
        uniprog_core::Error::TransferFailed
    }
}
