use tracing_subscriber::EnvFilter;

/// Logs to stderr; stdout is kept for the list of bad paths.
///
/// `RUST_LOG` wins over `verbose` when set.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .init();
}
