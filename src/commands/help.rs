//! `autonight help [COMMAND]`.

/// Show general help or the help of one command.
pub fn run_help_command(command: Option<&str>) {
    match command {
        None => crate::args::display_help(),
        Some("run") => display_run_help(),
        Some("status" | "st") => display_status_help(),
        Some("toggle" | "t") => super::toggle::display_help(),
        Some("test") => super::test::display_help(),
        Some("reload" | "r") => super::reload::display_help(),
        Some("stop") => super::stop::display_help(),
        Some("simulate" | "sim") => super::simulate::display_help(),
        Some("help" | "h") => display_help_help(),
        Some(unknown) => {
            log_pipe!();
            log_warning!("Unknown command: {unknown}");
            crate::args::display_help();
        }
    }
}

fn display_run_help() {
    log_version!();
    log_block_start!("run - Run the scheduler (default command)");
    log_block_start!("Usage: autonight [run] [--debug] [--config <dir>] [--log <file>]");
    log_block_start!("Evaluates the schedule every check_interval seconds and switches night");
    log_indented!("mode whenever the decision changes. Signals:");
    log_indented!("SIGUSR1  toggle now (autonight toggle)");
    log_indented!("SIGUSR2  reload the configuration (autonight reload)");
    log_indented!("SIGTERM  stop (autonight stop)");
    log_end!();
}

fn display_status_help() {
    log_version!();
    log_block_start!("status - Show the current decision");
    log_block_start!("Usage: autonight status");
    log_block_start!("Prints the loaded configuration, the mode deciding right now, the");
    log_indented!("next scheduled event and, when no scheduler is running, the state the");
    log_indented!("device reports.");
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: autonight help [COMMAND]");
    log_block_start!("Examples:");
    log_indented!("autonight help");
    log_indented!("autonight help simulate");
    log_end!();
}
