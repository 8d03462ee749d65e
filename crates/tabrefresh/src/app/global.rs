use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("tabrefresh")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Automatically refresh browser tabs on a timer, a page condition, or a schedule")
        .long_about("tabrefresh talks to the tabrefresh daemon, which keeps one refresh trigger per browser tab. Tabs refresh on a fixed interval (time), when their content meets a condition (conditional), or only inside a weekly time window (smart).")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}

/// Positional browser tab id shared by the per-tab commands.
pub fn tab_arg() -> Arg {
    Arg::new("tab")
        .help("Browser tab id")
        .required(true)
        .index(1)
        .allow_negative_numbers(true)
        .value_parser(clap::value_parser!(i64))
}

pub fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Output in JSON format")
        .action(ArgAction::SetTrue)
}
