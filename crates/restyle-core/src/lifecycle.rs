use tracing_subscriber::EnvFilter;

/// Initialize tracing with env filter support.
///
/// Set `RUST_LOG=debug` for verbose output, defaults to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();
}

pub fn log_startup(backend: &str) {
    tracing::info!("Restyle starting up ({backend} backend)");
}

pub fn log_shutdown() {
    tracing::info!("Restyle shutting down");
}
