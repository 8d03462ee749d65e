use clap::{Arg, Command};

use super::global::{json_arg, tab_arg};

pub fn status_command() -> Command {
    Command::new("status")
        .about("Show the refresh state of a tab")
        .arg(tab_arg())
        .arg(json_arg())
}

pub fn countdown_command() -> Command {
    Command::new("countdown")
        .about("Show time left until a tab's next refresh")
        .arg(tab_arg())
        .arg(json_arg())
}

pub fn tab_command() -> Command {
    Command::new("tab")
        .about("Ask the browser about a tab and its page-side state")
        .arg(tab_arg())
        .arg(json_arg())
}

pub fn watch_command() -> Command {
    Command::new("watch")
        .about("Stream refresh events until interrupted")
        .arg(
            Arg::new("tab")
                .long("tab")
                .help("Only show events for this tab")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(json_arg().help("Print raw JSON events"))
}
