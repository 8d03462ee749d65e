use clap::{Arg, ArgAction, Command};

use super::global::json_arg;

pub fn settings_command() -> Command {
    Command::new("settings")
        .about("Show or change global settings")
        .long_about(
            "Without options, prints the global settings stored by the daemon. \
             Any option updates them and applies the live-changeable ones to \
             every running refresh.",
        )
        .arg(json_arg())
        .arg(
            Arg::new("default-interval")
                .long("default-interval")
                .help("Interval used by 'start' when none is given (seconds)")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("confirm-refresh")
                .long("confirm-refresh")
                .help("Guard unsaved form input before refreshing")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new("resource-monitoring")
                .long("resource-monitoring")
                .help("Monitor page resources on refreshed tabs")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new("notifications")
                .long("notifications")
                .help("Show desktop notifications")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new("reload")
                .long("reload")
                .help("Save running refreshes so a restarted browser resumes them")
                .action(ArgAction::SetTrue),
        )
}

pub fn config_command() -> Command {
    Command::new("config")
        .about("Inspect the configuration file")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("check").about("Load and validate the configuration"))
        .subcommand(Command::new("path").about("Print the configuration file path"))
}
