//! # Dispatcher Module
//!
//! Pool di worker a dimensione fissa che esegue gli `EncodeTask`.
//!
//! ## Responsabilità:
//! - Limita i task in esecuzione con un `Semaphore` (backpressure)
//! - Raccoglie i risultati in ordine di completamento
//! - Isola i crash: un worker che va in panic diventa un fallimento
//!   attribuito al suo task, gli altri proseguono; l'output parziale del
//!   task viene rimosso
//! - Rispetta lo stop: i task non ancora partiti vengono marcati `Cancelled`

use super::encode_task::{EncodeTask, FailureKind, TaskResult};
use crate::file_manager::FileManager;
use crate::shutdown::StopSignal;
use futures::stream::{FuturesUnordered, StreamExt};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, error};

pub struct Dispatcher {
    concurrency: usize,
    stop: StopSignal,
}

impl Dispatcher {
    pub fn new(concurrency: usize, stop: StopSignal) -> Self {
        Self {
            concurrency: concurrency.max(1),
            stop,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every task through `execute` with at most `concurrency` in flight.
    ///
    /// Returns exactly one result per task, in completion order. `on_result`
    /// sees each result as soon as it arrives.
    pub async fn run_all<F, Fut, R>(&self, tasks: Vec<EncodeTask>, execute: F, mut on_result: R) -> Vec<TaskResult>
    where
        F: Fn(EncodeTask, StopSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
        R: FnMut(&TaskResult),
    {
        debug!("Dispatching {} tasks on {} workers", tasks.len(), self.concurrency);

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let execute = Arc::new(execute);
        let mut running = FuturesUnordered::new();

        for task in tasks {
            let descriptor = task.clone();
            let semaphore = semaphore.clone();
            let execute = execute.clone();
            let stop = self.stop.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return TaskResult::failure(
                            task,
                            FailureKind::Cancelled,
                            "worker pool closed".to_string(),
                            Duration::ZERO,
                        )
                    }
                };
                if stop.is_stopped() {
                    return TaskResult::failure(
                        task,
                        FailureKind::Cancelled,
                        "batch stopped before this file started".to_string(),
                        Duration::ZERO,
                    );
                }
                execute(task, stop).await
            });

            running.push(async move { (descriptor, handle.await) });
        }

        let mut results = Vec::with_capacity(running.len());
        while let Some((descriptor, joined)) = running.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    let reason = join_failure(e);
                    error!("Worker for {} crashed: {}", descriptor.relative_path.display(), reason);
                    FileManager::remove_partial_output(&descriptor.output_path).await;
                    TaskResult::failure(descriptor, FailureKind::Crashed, reason, Duration::ZERO)
                }
            };
            on_result(&result);
            results.push(result);
        }

        results
    }
}

fn join_failure(error: JoinError) -> String {
    if error.is_cancelled() {
        return "worker task was cancelled".to_string();
    }
    match error.try_into_panic() {
        Ok(payload) => format!("worker panicked: {}", panic_message(payload.as_ref())),
        Err(e) => format!("worker failed: {}", e),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
