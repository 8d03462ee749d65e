use clap::{Arg, ArgAction, Command};

use super::global::json_arg;

pub fn daemon_command() -> Command {
    Command::new("daemon")
        .about("Manage the tabrefresh daemon")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("start")
                .about("Start the tabrefresh daemon in the background")
                .arg(
                    Arg::new("foreground")
                        .long("foreground")
                        .help("Run daemon in the foreground (for debugging)")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("stop")
                .about("Stop the running tabrefresh daemon")
                .arg(
                    Arg::new("save-state")
                        .long("save-state")
                        .help("Save running refreshes so the next daemon resumes them")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show daemon status")
                .arg(json_arg()),
        )
}
