use std::sync::Arc;

use clinidraft_lib::api::server::start_api_server;
use clinidraft_lib::api::types::ApiContext;
use clinidraft_lib::config::{self, AppConfig};
use clinidraft_lib::db::sqlite::open_database;
use clinidraft_lib::pipeline::dispatcher::spawn_dispatcher;
use clinidraft_lib::pipeline::{build_runner, PipelineCounters};

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();
    clinidraft_lib::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = run(config).await {
        tracing::error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Migrations run once up front; workers and handlers reopen per use.
    open_database(&config.db_path)?;
    tracing::info!(db = %config.db_path.display(), "Database ready");

    let counters = Arc::new(PipelineCounters::default());
    let runner = {
        let config = config.clone();
        let counters = counters.clone();
        tokio::task::spawn_blocking(move || build_runner(&config, &counters)).await??
    };

    let (events, dispatcher) =
        spawn_dispatcher(Arc::new(runner), config.db_path.clone(), config.workers);

    let ctx = ApiContext::new(config.db_path.clone(), events, counters);
    let server = start_api_server(config.bind_addr, ctx).await?;
    tracing::info!(addr = %server.addr, workers = config.workers, "Pipeline service ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    // Dropping the server drops the last event sender, which stops the dispatcher.
    server.shutdown().await;
    dispatcher.await?;
    Ok(())
}
