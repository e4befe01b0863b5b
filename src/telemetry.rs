use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber.
///
/// Honours `RUST_LOG`, falling back to `info`. stdout is left for the report.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
