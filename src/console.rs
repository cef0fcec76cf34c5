//! Interactive console
//!
//! A menu-driven line editor in front of the [`Dispatcher`]. Each line is a
//! menu key or command name, optionally followed by its arguments; missing
//! arguments are asked for one at a time.
//!
//! # Example Session
//!
//! ```text
//! uniprog> 2
//! SPI Flash mode selected
//! spi> i
//! Reading device ID...
//! Manufacturer ID: 0xEF
//! Device ID: 0x4017
//! Device: Winbond W25Q64 (64Mbit)
//! spi> r 0x1000 16
//! Reading 16 bytes from address 0x1000
//! 0x1000: FF FF FF FF FF FF FF FF FF FF FF FF FF FF FF FF  | ................
//! ```

use crate::config::ConsoleConfig;
use crate::dispatch::{parse_bytes, parse_dec, parse_hex, Command, Dispatcher, Flow, MENU};
use crate::error::CliError;
use colored::Colorize;
use directories::ProjectDirs;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::borrow::Cow;
use std::io::Write;
use std::path::PathBuf;
use uniprog_core::engine::{EraseKind, Technology};
use uniprog_core::poll::Clock;
use uniprog_core::programmer::{I2cBus, ParallelBus, SpiMaster};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command names offered for completion, with their argument hints
const COMMANDS: &[(&str, &str)] = &[
    ("nand", ""),
    ("spi", ""),
    ("eeprom", ""),
    ("identify", ""),
    ("read", " <address> <length>"),
    ("write", " <address> <bytes...>"),
    ("erase", " <sector|block|chip> <address>"),
    ("status", ""),
    ("address", " <i2c-address>"),
    ("help", ""),
    ("quit", ""),
];

/// Source of answers for arguments missing from the command line
pub trait Prompt {
    /// Show `question` and return the trimmed answer
    fn ask(&mut self, question: &str) -> Result<String, CliError>;
}

/// Prompts through the console's line editor
struct EditorPrompt<'a> {
    rl: &'a mut Editor<ConsoleHelper, FileHistory>,
}

impl Prompt for EditorPrompt<'_> {
    fn ask(&mut self, question: &str) -> Result<String, CliError> {
        println!("{}", question.bright_cyan());
        let answer = self.rl.readline(&format!("{} ", ">".bright_green()))?;
        Ok(answer.trim().to_string())
    }
}

/// Line editor helper: command completion and argument hints
#[derive(Helper)]
struct ConsoleHelper;

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let word = &line[..pos];
        if word.contains(char::is_whitespace) {
            return Ok((0, Vec::new()));
        }
        let completions = COMMANDS
            .iter()
            .filter(|(name, _)| name.starts_with(word))
            .map(|(name, _)| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((0, completions))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos != line.len() {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(name, args)| *name == line && !args.is_empty())
            .map(|(_, args)| args.to_string())
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

impl Validator for ConsoleHelper {}

/// Get the ASCII banner
fn get_banner() -> String {
    format!(
        "\nUniversal Hardware Programmer\nv{} - NAND/SPI/I2C Memory\n",
        VERSION
    )
    .bright_yellow()
    .bold()
    .to_string()
}

/// Get the history file path
fn get_history_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "uniprog") {
        let mut path = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&path).ok();
        path.push("console_history");
        path
    } else {
        PathBuf::from(".uniprog_history")
    }
}

fn prompt_for(active: Option<Technology>) -> String {
    let name = match active {
        None => "uniprog",
        Some(Technology::Nand) => "nand",
        Some(Technology::SerialNor) => "spi",
        Some(Technology::AddressedEeprom) => "eeprom",
    };
    format!("{} ", format!("{}>", name).bright_green().bold())
}

/// Next argument from the line, or the answer to `question`
fn arg_or_ask<'a>(
    args: &mut impl Iterator<Item = &'a str>,
    prompt: &mut dyn Prompt,
    question: &str,
) -> Result<String, CliError> {
    match args.next() {
        Some(arg) => Ok(arg.to_string()),
        None => prompt.ask(question),
    }
}

/// Turn one console line into a command
///
/// Returns `Ok(None)` when the line was handled without a command (empty
/// line, unknown key, aborted menu choice).
pub fn parse_line(
    line: &str,
    selected: bool,
    limits: &ConsoleConfig,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<Option<Command>, CliError> {
    let mut words = line.split_whitespace();
    let Some(key) = words.next() else {
        return Ok(None);
    };
    let key = key.to_ascii_lowercase();

    let needs_device = matches!(
        key.as_str(),
        "i" | "id" | "identify" | "r" | "read" | "w" | "write" | "e" | "erase" | "s" | "status"
    );
    if needs_device && !selected {
        writeln!(out, "Please select memory type first!")?;
        return Ok(None);
    }

    let command = match key.as_str() {
        "1" | "nand" => Command::SelectTechnology(Technology::Nand),
        "2" | "spi" | "nor" => Command::SelectTechnology(Technology::SerialNor),
        "3" | "eeprom" | "i2c" => Command::SelectTechnology(Technology::AddressedEeprom),
        "i" | "id" | "identify" => Command::Identify,
        "r" | "read" => {
            let address = parse_hex(&arg_or_ask(
                &mut words,
                prompt,
                "Enter start address (in hex):",
            )?);
            let length = parse_dec(&arg_or_ask(
                &mut words,
                prompt,
                "Enter number of bytes to read:",
            )?);
            Command::ReadData {
                address,
                length: length as usize,
            }
        }
        "w" | "write" => {
            let address = parse_hex(&arg_or_ask(
                &mut words,
                prompt,
                "Enter start address (in hex):",
            )?);
            let rest: Vec<&str> = words.by_ref().collect();
            let input = if rest.is_empty() {
                prompt.ask(&format!(
                    "Enter data (hex bytes separated by spaces, max {} bytes):",
                    limits.max_write
                ))?
            } else {
                rest.join(" ")
            };
            let (bytes, truncated) = parse_bytes(&input, limits.max_write);
            if truncated {
                writeln!(out, "Warning: Limiting to {} bytes", bytes.len())?;
            }
            Command::WriteData { address, bytes }
        }
        "e" | "erase" => {
            let option = match words.next() {
                Some(option) => option.to_string(),
                None => prompt.ask("Erase options:\n1. Sector erase\n2. Block erase\n3. Chip erase")?,
            };
            let kind = match option.to_ascii_lowercase().as_str() {
                "1" | "sector" => EraseKind::Sector,
                "2" | "block" => EraseKind::Block,
                "3" | "chip" => EraseKind::Chip,
                _ => {
                    writeln!(out, "Invalid option")?;
                    return Ok(None);
                }
            };
            if kind == EraseKind::Chip {
                let answer = prompt
                    .ask("WARNING: This will erase the entire chip!\nType 'YES' to confirm:")?;
                Command::Erase {
                    kind,
                    address: 0,
                    confirmed: answer == "YES",
                }
            } else {
                let address = parse_hex(&arg_or_ask(
                    &mut words,
                    prompt,
                    "Enter start address (in hex):",
                )?);
                Command::Erase {
                    kind,
                    address,
                    confirmed: false,
                }
            }
        }
        "s" | "status" => Command::ReadStatus,
        "a" | "address" => {
            let raw = parse_hex(&arg_or_ask(
                &mut words,
                prompt,
                "Enter I2C address (in hex, e.g. 50 for 0x50):",
            )?);
            Command::SetBusDeviceAddress(raw)
        }
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        _ => {
            writeln!(out, "Unknown command. Type 'h' for help.")?;
            return Ok(None);
        }
    };

    if words.next().is_some() {
        log::debug!("Ignoring extra arguments in {:?}", line);
    }
    Ok(Some(command))
}

/// Run the interactive console until the user quits
pub fn run_console<P, M, B, C>(dispatcher: &mut Dispatcher<P, M, B, C>) -> Result<(), CliError>
where
    P: ParallelBus,
    M: SpiMaster,
    B: I2cBus,
    C: Clock,
{
    let mut rl = Editor::<ConsoleHelper, FileHistory>::new()?;
    rl.set_helper(Some(ConsoleHelper));

    let history_path = get_history_path();
    if rl.load_history(&history_path).is_err() {
        log::debug!("No console history at {}", history_path.display());
    }

    println!("{}", get_banner());
    print!("{}", MENU);
    println!();

    let limits = *dispatcher.limits();
    let mut stdout = std::io::stdout();

    loop {
        let active = dispatcher.session().active();
        let line = match rl.readline(&prompt_for(active)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "Error".bright_red().bold(), err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        let parsed = parse_line(
            &line,
            active.is_some(),
            &limits,
            &mut EditorPrompt { rl: &mut rl },
            &mut stdout,
        );
        let command = match parsed {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(CliError::Readline(ReadlineError::Interrupted | ReadlineError::Eof)) => {
                println!("^C");
                continue;
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".bright_red().bold(), e);
                continue;
            }
        };

        match dispatcher.execute(command, &mut stdout) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => eprintln!("{}: {}", "Error".bright_red().bold(), e),
        }
        let _ = stdout.flush();
    }

    if let Err(e) = rl.save_history(&history_path) {
        eprintln!(
            "{}: Failed to save history: {}",
            "Warning".bright_yellow(),
            e
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Answers prompts from a fixed script and records the questions
    struct Scripted {
        answers: VecDeque<&'static str>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompt for Scripted {
        fn ask(&mut self, question: &str) -> Result<String, CliError> {
            self.asked.push(question.to_string());
            self.answers
                .pop_front()
                .map(str::to_string)
                .ok_or(CliError::Readline(ReadlineError::Eof))
        }
    }

    fn parse(line: &str, answers: &[&'static str]) -> (Option<Command>, String, Scripted) {
        let mut prompt = Scripted::new(answers);
        let mut out = Vec::new();
        let command = parse_line(line, true, &ConsoleConfig::default(), &mut prompt, &mut out)
            .unwrap();
        (command, String::from_utf8(out).unwrap(), prompt)
    }

    #[test]
    fn test_menu_keys_and_names() {
        assert_eq!(
            parse("1", &[]).0,
            Some(Command::SelectTechnology(Technology::Nand))
        );
        assert_eq!(
            parse("SPI", &[]).0,
            Some(Command::SelectTechnology(Technology::SerialNor))
        );
        assert_eq!(
            parse("3", &[]).0,
            Some(Command::SelectTechnology(Technology::AddressedEeprom))
        );
        assert_eq!(parse("identify", &[]).0, Some(Command::Identify));
        assert_eq!(parse("s", &[]).0, Some(Command::ReadStatus));
        assert_eq!(parse("h", &[]).0, Some(Command::Help));
        assert_eq!(parse("q", &[]).0, Some(Command::Quit));
        assert_eq!(parse("   ", &[]).0, None);
    }

    #[test]
    fn test_unknown_key() {
        let (command, out, _) = parse("x", &[]);
        assert_eq!(command, None);
        assert_eq!(out, "Unknown command. Type 'h' for help.\n");
    }

    #[test]
    fn test_read_inline_arguments() {
        let (command, _, prompt) = parse("r 0x1000 300", &[]);
        assert_eq!(
            command,
            Some(Command::ReadData {
                address: 0x1000,
                length: 300
            })
        );
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_read_prompts_for_missing_arguments() {
        let (command, _, prompt) = parse("read", &["1F0", "32"]);
        assert_eq!(
            command,
            Some(Command::ReadData {
                address: 0x1F0,
                length: 32
            })
        );
        assert_eq!(
            prompt.asked,
            ["Enter start address (in hex):", "Enter number of bytes to read:"]
        );
    }

    #[test]
    fn test_write_truncates_with_warning() {
        let data: Vec<String> = (0..33).map(|i| format!("{:X}", i)).collect();
        let line = format!("w 100 {}", data.join(","));
        let (command, out, _) = parse(&line, &[]);

        let Some(Command::WriteData { address, bytes }) = command else {
            panic!("expected a write");
        };
        assert_eq!(address, 0x100);
        assert_eq!(bytes.len(), 32);
        assert_eq!(out, "Warning: Limiting to 32 bytes\n");
    }

    #[test]
    fn test_write_prompts_for_data() {
        let (command, _, prompt) = parse("w 0x40", &["AA BB"]);
        let Some(Command::WriteData { address, bytes }) = command else {
            panic!("expected a write");
        };
        assert_eq!(address, 0x40);
        assert_eq!(&bytes[..], &[0xAA, 0xBB]);
        assert_eq!(
            prompt.asked,
            ["Enter data (hex bytes separated by spaces, max 32 bytes):"]
        );
    }

    #[test]
    fn test_erase_menu() {
        let (command, _, _) = parse("e", &["2", "10000"]);
        assert_eq!(
            command,
            Some(Command::Erase {
                kind: EraseKind::Block,
                address: 0x10000,
                confirmed: false
            })
        );

        let (command, out, _) = parse("e 9", &[]);
        assert_eq!(command, None);
        assert_eq!(out, "Invalid option\n");
    }

    #[test]
    fn test_chip_erase_confirmation() {
        let (command, _, _) = parse("erase chip", &["YES"]);
        assert_eq!(
            command,
            Some(Command::Erase {
                kind: EraseKind::Chip,
                address: 0,
                confirmed: true
            })
        );

        let (command, _, _) = parse("erase chip", &["yes"]);
        assert_eq!(
            command,
            Some(Command::Erase {
                kind: EraseKind::Chip,
                address: 0,
                confirmed: false
            })
        );
    }

    #[test]
    fn test_set_address() {
        let (command, _, _) = parse("a", &["51"]);
        assert_eq!(command, Some(Command::SetBusDeviceAddress(0x51)));
    }

    #[test]
    fn test_device_commands_need_selection() {
        let mut prompt = Scripted::new(&[]);
        let mut out = Vec::new();
        let command = parse_line(
            "r",
            false,
            &ConsoleConfig::default(),
            &mut prompt,
            &mut out,
        )
        .unwrap();
        assert_eq!(command, None);
        assert!(prompt.asked.is_empty());
        assert_eq!(String::from_utf8(out).unwrap(), "Please select memory type first!\n");
    }

    #[test]
    fn test_prompt_end_of_input_is_an_error() {
        let mut prompt = Scripted::new(&[]);
        let mut out = Vec::new();
        let result = parse_line("read", true, &ConsoleConfig::default(), &mut prompt, &mut out);
        assert!(matches!(
            result,
            Err(CliError::Readline(ReadlineError::Eof))
        ));
    }
}
