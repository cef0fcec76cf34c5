//! Backend registration and dispatch
//!
//! A backend supplies the three transports the session drives. Backends are
//! named with a string of the form `name` or `name:key=value,key=value`.

use crate::config::Config;
use std::rc::Rc;
use uniprog_core::engine::{EepromEngine, NandEngine, SpiNorEngine};
use uniprog_core::poll::Clock;
use uniprog_core::programmer::{I2cBus, ParallelBus, SpiMaster};
use uniprog_core::Session;
use uniprog_dummy::Bench;

/// Session over runtime-selected transports
pub type BoxedSession =
    Session<Box<dyn ParallelBus>, Box<dyn SpiMaster>, Box<dyn I2cBus>, Rc<dyn Clock>>;

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    backends.push(BackendInfo {
        name: "sim",
        aliases: &["dummy"],
        description: "Simulated NAND, SPI NOR and I2C EEPROM chips",
    });

    #[cfg(feature = "linux-gpio")]
    backends.push(BackendInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description: "Linux GPIO bitbang (dev=/dev/gpiochipN,<pin>=<line>,...)",
    });

    backends
}

/// Generate help text listing all available backends
pub fn backend_help() -> String {
    let mut help = String::from("Available backends:\n");
    for b in available_backends() {
        help.push_str(&format!("  {:12} - {}\n", b.name, b.description));
        if !b.aliases.is_empty() {
            help.push_str(&format!("  {:12}   aliases: {}\n", "", b.aliases.join(", ")));
        }
    }
    help
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let names: Vec<&str> = available_backends().iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the primary backend name
pub fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Parse a backend string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_backend_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the backend named by `backend` and wrap it in a session
pub fn open_session(
    backend: &str,
    config: &Config,
) -> Result<BoxedSession, Box<dyn std::error::Error>> {
    let (name, options) = parse_backend_string(backend);

    match find_backend(name) {
        Some("sim") => {
            for (key, value) in &options {
                log::warn!("sim: Unknown option: {}={}", key, value);
            }
            Ok(open_sim(config))
        }
        #[cfg(feature = "linux-gpio")]
        Some("linux_gpio") => {
            let transports = uniprog_linux_gpio::open_linux_gpio(&options)?;
            let clock: Rc<dyn Clock> = Rc::new(uniprog_core::poll::StdClock::new());
            Ok(Session::new(
                NandEngine::new(transports.nand, clock.clone(), config.nand),
                SpiNorEngine::new(transports.spi, clock.clone(), config.spi_nor),
                EepromEngine::new(transports.i2c, clock, config.eeprom),
            ))
        }
        _ => Err(unknown_backend_error(name)),
    }
}

fn open_sim(config: &Config) -> BoxedSession {
    let bench = Bench::new(config.nand, config.spi_nor, config.eeprom);
    log::info!("sim: Simulated bench ready (EEPROM at {})", bench.eeprom_config.bus_address);

    let clock: Rc<dyn Clock> = Rc::new(bench.clock);
    let nand: Box<dyn ParallelBus> = Box::new(bench.nand);
    let spi: Box<dyn SpiMaster> = Box::new(bench.spi);
    let i2c: Box<dyn I2cBus> = Box::new(bench.i2c);
    Session::new(
        NandEngine::new(nand, clock.clone(), bench.nand_config),
        SpiNorEngine::new(spi, clock.clone(), bench.spi_config),
        EepromEngine::new(i2c, clock, bench.eeprom_config),
    )
}

fn unknown_backend_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown backend: {}\n\n", name);
    msg.push_str(&backend_help());
    msg.push_str("\nUse 'uniprog list-backends' for more details");
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uniprog_core::engine::Technology;

    #[test]
    fn test_parse_backend_string() {
        assert_eq!(parse_backend_string("sim"), ("sim", vec![]));
        assert_eq!(
            parse_backend_string("linux_gpio:dev=/dev/gpiochip0,scl=3,bogus,sda=2"),
            (
                "linux_gpio",
                vec![("dev", "/dev/gpiochip0"), ("scl", "3"), ("sda", "2")]
            )
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(find_backend("dummy"), Some("sim"));
        assert_eq!(find_backend("ch341a"), None);
    }

    #[test]
    fn test_unknown_backend() {
        let err = open_session("ch341a", &Config::default()).err().unwrap();
        assert!(err.to_string().starts_with("Unknown backend: ch341a"));
    }

    #[test]
    fn test_sim_session_works_through_boxes() {
        let mut session = open_session("sim", &Config::default()).unwrap();
        session.select(Technology::SerialNor).unwrap();
        let engine = session.engine().unwrap();
        engine.write_data(0x100, b"uniprog").unwrap();
        let mut buf = [0u8; 7];
        engine.read_data(0x100, &mut buf).unwrap();
        assert_eq!(&buf, b"uniprog");
    }
}
