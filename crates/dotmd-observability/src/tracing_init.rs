use tracing_subscriber::EnvFilter;

/// Initialises the global `tracing` subscriber. Called exactly once, from
/// `main()` in the CLI or the service binary — never from a library crate.
///
/// `RUST_LOG` takes precedence over `level` if set; `json` switches between
/// the compact human-readable formatter and newline-delimited JSON, for
/// piping the service's stdout into a log aggregator.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
