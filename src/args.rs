//! Command-line argument parsing.
//!
//! ```text
//! autonight [OPTIONS] [COMMAND]
//!
//! Commands: run (default), status, toggle, test, reload, stop,
//!           simulate <start> <end>, help [COMMAND]
//! Options:  -d/--debug, -c/--config <dir>, -l/--log <file>, --step <secs>,
//!           -h/--help, -V/--version
//! ```
//!
//! Flags may appear before or after the command.

use crate::common::constants::{DEFAULT_SIMULATION_STEP, MAXIMUM_SIMULATION_STEP};

/// What the binary should do.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon.
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Print diagnostics.
    StatusCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Flip night mode, through the daemon if one is running.
    ToggleCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// One diagnostic toggle with status queries around it.
    TestCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Make the running daemon re-read its configuration.
    ReloadCommand { debug_enabled: bool },
    /// Stop the running daemon.
    StopCommand { debug_enabled: bool },
    /// Dry-run the schedule over a time range.
    SimulateCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
        start_time: String,
        end_time: String,
        step_secs: u64,
    },
    /// `help [COMMAND]`
    HelpCommand { command: Option<String> },
    ShowHelp,
    ShowVersion,
    /// Unknown or malformed arguments; usage is printed and the exit code is non-zero.
    ShowHelpDueToError,
}

pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse `args`, whose first element is the program name.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ParsedArgs {
            action: parse_action(args.into_iter().skip(1).map(|s| s.as_ref().to_string())),
        }
    }
}

fn parse_action(args: impl Iterator<Item = String>) -> CliAction {
    let mut debug_enabled = false;
    let mut display_help = false;
    let mut display_version = false;
    let mut config_dir: Option<String> = None;
    let mut log_file: Option<String> = None;
    let mut step_secs: Option<u64> = None;
    let mut positionals: Vec<String> = Vec::new();

    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => display_help = true,
            "--version" | "-V" | "-v" => display_version = true,
            "--debug" | "-d" => debug_enabled = true,
            "--config" | "-c" | "--log" | "-l" | "--step" => {
                let Some(value) = args.next_if(|next| !next.starts_with('-')) else {
                    log_warning!("Missing value for {arg}");
                    return CliAction::ShowHelpDueToError;
                };
                match arg.as_str() {
                    "--config" | "-c" => config_dir = Some(value),
                    "--log" | "-l" => log_file = Some(value),
                    _ => match value.parse::<u64>() {
                        Ok(secs) if (1..=MAXIMUM_SIMULATION_STEP).contains(&secs) => {
                            step_secs = Some(secs)
                        }
                        _ => {
                            log_warning!(
                                "Invalid step '{value}', expected whole seconds from 1 to {MAXIMUM_SIMULATION_STEP}"
                            );
                            return CliAction::ShowHelpDueToError;
                        }
                    },
                }
            }
            flag if flag.starts_with('-') => {
                log_warning!("Unknown option: {flag}");
                return CliAction::ShowHelpDueToError;
            }
            _ => positionals.push(arg),
        }
    }

    if display_version {
        return CliAction::ShowVersion;
    }

    let (command, rest) = match positionals.split_first() {
        Some((command, rest)) => (Some(command.as_str()), rest),
        None => (None, &[][..]),
    };

    if display_help {
        return match command {
            Some(command) => CliAction::HelpCommand {
                command: Some(command.to_string()),
            },
            None => CliAction::ShowHelp,
        };
    }

    let expected_args = match command {
        Some("simulate" | "sim") => 2,
        Some("help" | "h") => rest.len().min(1),
        _ => 0,
    };
    if rest.len() != expected_args {
        match command {
            Some("simulate" | "sim") => {
                log_warning!("Usage: autonight simulate <start> <end> [--step <secs>]");
            }
            Some(command) => log_warning!("Unexpected arguments for '{command}': {}", rest.join(" ")),
            None => {}
        }
        return CliAction::ShowHelpDueToError;
    }

    match command {
        None | Some("run") => CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        },
        Some("status" | "st") => CliAction::StatusCommand {
            debug_enabled,
            config_dir,
        },
        Some("toggle" | "t") => CliAction::ToggleCommand {
            debug_enabled,
            config_dir,
        },
        Some("test") => CliAction::TestCommand {
            debug_enabled,
            config_dir,
        },
        Some("reload" | "r") => CliAction::ReloadCommand { debug_enabled },
        Some("stop") => CliAction::StopCommand { debug_enabled },
        Some("simulate" | "sim") => CliAction::SimulateCommand {
            debug_enabled,
            config_dir,
            start_time: rest[0].clone(),
            end_time: rest[1].clone(),
            step_secs: step_secs.unwrap_or(DEFAULT_SIMULATION_STEP),
        },
        Some("help" | "h") => CliAction::HelpCommand {
            command: rest.first().cloned(),
        },
        Some(unknown) => {
            log_warning!("Unknown command: {unknown}");
            CliAction::ShowHelpDueToError
        }
    }
}

/// Print the version line.
pub fn display_version_info() {
    log_version!();
    log_end!();
}

/// Print general usage.
pub fn display_help() {
    log_version!();
    log_block_start!("Usage: autonight [OPTIONS] [COMMAND]");
    log_block_start!("Commands:");
    log_indented!("run                      Run the scheduler (default)");
    log_indented!("status, st               Show configuration, decision and device state");
    log_indented!("toggle, t                Switch night mode now");
    log_indented!("test                     Toggle once and query the device before and after");
    log_indented!("reload, r                Make the running scheduler re-read its config");
    log_indented!("stop                     Stop the running scheduler");
    log_indented!("simulate <start> <end>   Print the schedule's transitions over a time range");
    log_indented!("help, h [COMMAND]        Show help for a command");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>       Use a custom configuration directory");
    log_indented!("-d, --debug              Enable detailed debug output");
    log_indented!("-l, --log <file>         Write output to a file instead of stdout");
    log_indented!("    --step <secs>        Simulation step (default 60)");
    log_indented!("-h, --help               Print help");
    log_indented!("-V, --version            Print version");
    log_end!();
}
