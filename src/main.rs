//! uniprog - bench programmer for NAND, SPI NOR and I2C EEPROM chips
//!
//! One command surface for three memory technologies. The protocol engines
//! live in `uniprog-core`; this binary wires them to a backend (simulated
//! chips or Linux GPIO lines), then either runs the interactive console or
//! a single command.
//!
//! # Examples
//!
//! ```bash
//! # Interactive console on the simulated bench
//! uniprog
//!
//! # Dump 64 bytes of SPI flash over GPIO
//! uniprog -b linux_gpio:gpiochip=0,cs=25,sck=11,mosi=10,miso=9 read -t spi -a 0 -l 64
//! ```

mod backends;
mod cli;
mod config;
mod console;
mod dispatch;
mod error;
mod progress;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use dispatch::{parse_bytes, Command, Dispatcher};
use std::io::Write;
use uniprog_core::engine::Technology;
use uniprog_core::poll::Clock;
use uniprog_core::programmer::{I2cBus, ParallelBus, SpiMaster};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Some(Commands::ListBackends) = cli.command {
        print!("{}", backends::backend_help());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let session = backends::open_session(&cli.backend, &config)?;
    let mut dispatcher = Dispatcher::new(session, config.console).with_progress_display();

    let (tech, command) = match cli.command {
        None | Some(Commands::Console) => {
            console::run_console(&mut dispatcher)?;
            return Ok(());
        }
        Some(Commands::ListBackends) => return Ok(()),
        Some(Commands::Identify { tech }) => (tech.into(), Command::Identify),
        Some(Commands::Scan) => (Technology::AddressedEeprom, Command::Identify),
        Some(Commands::Status { tech }) => (tech.into(), Command::ReadStatus),
        Some(Commands::Read {
            tech,
            address,
            length,
        }) => (tech.into(), Command::ReadData { address, length }),
        Some(Commands::Write {
            tech,
            address,
            bytes,
        }) => {
            let max_write = config.console.max_write;
            let (bytes, truncated) = parse_bytes(&bytes.join(" "), max_write);
            if truncated {
                log::warn!("Limiting to {} bytes", max_write);
            }
            (tech.into(), Command::WriteData { address, bytes })
        }
        Some(Commands::Erase {
            tech,
            kind,
            address,
            yes,
        }) => (
            tech.into(),
            Command::Erase {
                kind: kind.into(),
                address,
                confirmed: yes,
            },
        ),
    };

    run_once(&mut dispatcher, tech, command)
}

/// Select `tech` and run a single command against it
fn run_once<P, M, B, C>(
    dispatcher: &mut Dispatcher<P, M, B, C>,
    tech: Technology,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: ParallelBus,
    M: SpiMaster,
    B: I2cBus,
    C: Clock,
{
    let mut stdout = std::io::stdout();
    dispatcher.execute(Command::SelectTechnology(tech), &mut stdout)?;
    dispatcher.execute(command, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
