//! In-process event dispatcher: one blocking worker per delivered event,
//! bounded by a semaphore.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use super::trigger::FileUploadedEvent;
use super::workflow::{PipelineError, PipelineRunner};
use crate::db::sqlite::open_database;

/// Queue capacity before ingest starts applying backpressure.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Spawn the dispatch loop. Events sent on the returned channel are executed
/// with at most `workers` runs in flight. The loop ends when every sender is dropped.
pub fn spawn_dispatcher(
    runner: Arc<PipelineRunner>,
    db_path: PathBuf,
    workers: usize,
) -> (mpsc::Sender<FileUploadedEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<FileUploadedEvent>(EVENT_QUEUE_CAPACITY);
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));

    let handle = tokio::spawn(async move {
        let mut in_flight = tokio::task::JoinSet::new();

        while let Some(event) = rx.recv().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let runner = runner.clone();
            let db_path = db_path.clone();

            in_flight.spawn(async move {
                let file_id = event.id.clone();
                let result = tokio::task::spawn_blocking(move || -> Result<_, PipelineError> {
                    let conn = open_database(&db_path)?;
                    runner.execute(&conn, &event)
                })
                .await;
                drop(permit);

                match result {
                    Ok(Ok(run)) => tracing::info!(
                        run_id = %run.id,
                        file_id = %file_id,
                        status = %run.status,
                        "Pipeline execution finished"
                    ),
                    Ok(Err(e)) => {
                        tracing::error!(file_id = %file_id, error = %e, "Pipeline execution aborted")
                    }
                    Err(e) => tracing::error!(file_id = %file_id, error = %e, "Pipeline worker panicked"),
                }
            });

            // Reap finished workers so the set does not grow unbounded.
            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        // Blocking HTTP clients inside the runner must be dropped off the async runtime.
        let _ = tokio::task::spawn_blocking(move || drop(runner)).await;
        tracing::info!("Event dispatcher stopped");
    });

    (tx, handle)
}
