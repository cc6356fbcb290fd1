//! autonight binary: parse the command line and dispatch.

use autonight::args::{CliAction, ParsedArgs};
use autonight::commands;
use autonight::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use autonight::common::logger::Log;
use autonight::{Autonight, config};

use anyhow::Result;

fn main() {
    let parsed = ParsedArgs::parse(std::env::args());

    let code = match run(parsed.action) {
        Ok(code) => code,
        Err(e) => {
            autonight::log_error_exit!("{e:#}");
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}

fn run(action: CliAction) -> Result<i32> {
    match action {
        CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        } => {
            config::set_config_dir(config_dir)?;
            let _log_guard = match log_file {
                Some(path) => Some(Log::start_file_logging(path)?),
                None => None,
            };
            Autonight::new(debug_enabled).run()?;
        }
        CliAction::StatusCommand {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::status::handle_status_command(debug_enabled)?;
        }
        CliAction::ToggleCommand {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::toggle::handle_toggle_command(debug_enabled)?;
        }
        CliAction::TestCommand {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::test::handle_test_command(debug_enabled)?;
        }
        CliAction::ReloadCommand { debug_enabled } => {
            commands::reload::handle_reload_command(debug_enabled)?;
        }
        CliAction::StopCommand { debug_enabled } => {
            commands::stop::handle_stop_command(debug_enabled)?;
        }
        CliAction::SimulateCommand {
            debug_enabled,
            config_dir,
            start_time,
            end_time,
            step_secs,
        } => {
            config::set_config_dir(config_dir)?;
            commands::simulate::handle_simulate_command(
                start_time,
                end_time,
                step_secs,
                debug_enabled,
            )?;
        }
        CliAction::HelpCommand { command } => commands::help::run_help_command(command.as_deref()),
        CliAction::ShowHelp => autonight::args::display_help(),
        CliAction::ShowVersion => autonight::args::display_version_info(),
        CliAction::ShowHelpDueToError => {
            autonight::args::display_help();
            return Ok(EXIT_FAILURE);
        }
    }

    Ok(EXIT_SUCCESS)
}
