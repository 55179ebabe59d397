pub mod api; // Lifecycle, query and ingest HTTP surface
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline; // Extraction → normalization → generation

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
