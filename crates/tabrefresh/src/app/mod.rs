mod daemon;
mod global;
mod query;
mod refresh;
mod settings;


use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(refresh::start_command())
        .subcommand(refresh::stop_command())
        .subcommand(refresh::reset_count_command())
        .subcommand(refresh::iterate_command())
        .subcommand(refresh::live_command())
        .subcommand(refresh::rearm_command())
        .subcommand(query::status_command())
        .subcommand(query::countdown_command())
        .subcommand(query::tab_command())
        .subcommand(query::watch_command())
        .subcommand(settings::settings_command())
        .subcommand(settings::config_command())
        .subcommand(daemon::daemon_command())
}
