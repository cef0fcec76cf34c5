//! Error types for uniprog-core
//!
//! This module provides a no_std compatible error type shared by every
//! transport and protocol engine in the crate.

use core::fmt;

/// Which device-side operation reported failure through its status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedOperation {
    /// Page program / data load
    Program,
    /// Block or sector erase
    Erase {
        /// Address the erase was issued for
        addr: u32,
    },
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Session errors
    /// No memory technology has been selected yet
    DeviceNotSelected,

    // Request errors
    /// Address or length is outside what the device or the request allows
    InvalidAddressOrLength,
    /// NAND write would straddle a page boundary
    PageBoundaryViolation,
    /// Malformed value supplied by the caller
    InvalidInput,

    // Device errors
    /// A bounded wait for device readiness expired
    Timeout,
    /// Device status reported a program/erase failure
    OperationFailed(FailedOperation),
    /// Addressed bus device did not acknowledge
    BusNotResponding,

    // Transport errors
    /// The underlying transport failed to move bytes
    TransferFailed,
}

impl fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program => write!(f, "program failed"),
            Self::Erase { addr } => write!(f, "erase failed at address 0x{:06X}", addr),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotSelected => write!(f, "no memory type selected"),
            Self::InvalidAddressOrLength => write!(f, "invalid address or length"),
            Self::PageBoundaryViolation => write!(f, "write crosses page boundary"),
            Self::InvalidInput => write!(f, "invalid input"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::OperationFailed(op) => write!(f, "{}", op),
            Self::BusNotResponding => write!(f, "device not responding"),
            Self::TransferFailed => write!(f, "bus transfer failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
