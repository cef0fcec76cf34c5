//! Error types for the uniprog binary

use thiserror::Error;

/// Errors surfaced by the dispatcher, console and one-shot commands
#[derive(Error, Debug)]
pub enum CliError {
    /// The active engine reported a failure
    #[error("{0}")]
    Device(#[from] uniprog_core::Error),

    /// Writing command output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Line editor failure
    #[error("Console error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Errors loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the expected schema
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside what the tool supports
    #[error("{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        min: u32,
        max: u32,
        value: u32,
    },

    /// A value conflicts with another setting or cannot be represented
    #[error("{key} {reason}")]
    Inconsistent {
        key: &'static str,
        reason: &'static str,
    },
}
