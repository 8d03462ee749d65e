use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with optional quiet mode.
///
/// When `quiet` is true, tabrefresh events are suppressed so stderr carries
/// only user-facing messages. Otherwise info-level and above are emitted.
/// `RUST_LOG` directives are layered on top.
pub fn init_logging(quiet: bool) {
    let level = if quiet { "off" } else { "info" };

    let mut filter = EnvFilter::from_default_env();
    for target in [
        "tabrefresh",
        "tabrefresh_config",
        "tabrefresh_core",
        "tabrefresh_daemon",
        "tabrefresh_protocol",
    ] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    // try_init: a second call (tests, embedded use) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .try_init();
}
