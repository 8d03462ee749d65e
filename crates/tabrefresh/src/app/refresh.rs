use clap::{Arg, ArgAction, ArgGroup, Command};

use super::global::tab_arg;

pub fn start_command() -> Command {
    Command::new("start")
        .about("Start auto-refreshing a tab")
        .long_about(
            "Starts refreshing a tab, replacing any refresh it already has. \
             Without --interval the saved default interval is used.",
        )
        .arg(tab_arg())
        .arg(
            Arg::new("mode")
                .long("mode")
                .short('m')
                .help("Refresh strategy")
                .value_parser(["time", "conditional", "smart"])
                .default_value("time"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .short('i')
                .help("Interval between refreshes, in --unit")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("unit")
                .long("unit")
                .short('u')
                .help("Interval unit: ms, s, m or h")
                .default_value("s"),
        )
        .arg(
            Arg::new("condition-type")
                .long("condition-type")
                .help("Conditional mode: contains_text, not_contains_text or text_changed"),
        )
        .arg(
            Arg::new("condition-value")
                .long("condition-value")
                .help("Text to look for (contains_text / not_contains_text)"),
        )
        .arg(
            Arg::new("selector")
                .long("selector")
                .help("Only read the first element matching this CSS selector"),
        )
        .arg(
            Arg::new("days")
                .long("days")
                .help("Smart mode: active weekdays, comma separated (mon,tue,...)")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .help("Smart mode: window start (HH:MM)")
                .requires("to"),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .help("Smart mode: window end (HH:MM, inclusive)")
                .requires("from"),
        )
        .arg(
            Arg::new("continue-iteration")
                .long("continue-iteration")
                .help("Ask whether to keep going after every refresh")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("form-protection")
                .long("form-protection")
                .help("Ask the page to guard unsaved form input")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("monitor")
                .long("monitor")
                .help("Resource URL patterns to monitor, comma separated")
                .value_delimiter(','),
        )
}

pub fn stop_command() -> Command {
    Command::new("stop")
        .about("Stop auto-refreshing a tab")
        .arg(tab_arg())
}

pub fn reset_count_command() -> Command {
    Command::new("reset-count")
        .about("Reset a tab's refresh counter to zero")
        .arg(tab_arg())
}

pub fn iterate_command() -> Command {
    Command::new("iterate")
        .about("Turn the continue prompt on or off for an active refresh")
        .arg(tab_arg())
        .arg(
            Arg::new("on")
                .long("on")
                .help("Ask after every refresh")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("off")
                .long("off")
                .help("Stop asking")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("toggle")
                .args(["on", "off"])
                .required(true),
        )
}

pub fn live_command() -> Command {
    Command::new("live")
        .about("Change settings of a running refresh without restarting it")
        .long_about(
            "Applies page-side settings to an active refresh. Interval and \
             condition changes need 'tabrefresh start' again and are rejected.",
        )
        .arg(tab_arg())
        .arg(
            Arg::new("form-protection")
                .long("form-protection")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new("resource-monitoring")
                .long("resource-monitoring")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new("monitor")
                .long("monitor")
                .help("Replace the monitored resource patterns, comma separated")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .help("Rejected while refreshing; shown for the error")
                .value_parser(clap::value_parser!(u64)),
        )
}

pub fn rearm_command() -> Command {
    Command::new("rearm").about("Restart every countdown from now")
}
