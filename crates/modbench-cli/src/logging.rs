use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr so stdout stays reserved for the benchmark
/// report lines.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modbench=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
