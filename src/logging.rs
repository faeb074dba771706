use tracing_subscriber::EnvFilter;

/// Env var holding the filter directive, e.g. `CHAMADAD_LOG=chamadad=debug`.
pub const LOG_ENV: &str = "CHAMADAD_LOG";

/// Installs the stderr subscriber. Stdout carries IPC responses only.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init();
}
