use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global tracing subscriber. Filtering follows `RUST_LOG` (default `info`),
/// so `RUST_LOG=rag_adapters=debug` shows per-request detail.
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
