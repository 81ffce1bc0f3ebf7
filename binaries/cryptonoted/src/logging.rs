//! `tracing-subscriber` wiring.

use tracing_subscriber::EnvFilter;

/// Initializes a stdout `tracing` subscriber filtered by `level`, which is
/// either a bare level (`"info"`) or a full `EnvFilter` directive string
/// (`"cryptonote_blockchain=debug,info"`).
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
