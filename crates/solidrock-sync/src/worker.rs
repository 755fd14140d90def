//! Sync Worker
//!
//! Background worker that executes queued work items.
//! Handles time budgets, retries and graceful shutdown.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::SyncResult;
use crate::executor::{WorkExecutor, WorkOutcome};
use crate::queue::{QueueError, QueuedWork, WorkQueue};

/// Worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How often to poll the queue (in milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often to release stale work items (in seconds).
    #[serde(default = "default_stale_release_interval_secs")]
    pub stale_release_interval_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_stale_release_interval_secs() -> u64 {
    60
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stale_release_interval_secs: default_stale_release_interval_secs(),
        }
    }
}

/// How a dequeued item ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkStatus {
    Completed(WorkOutcome),
    /// Failed and went back to the queue.
    Retrying { error: String },
    /// Failed permanently.
    Failed { error: String },
}

/// One processed work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedWork {
    pub id: Uuid,
    pub description: String,
    pub attempts: u32,
    pub status: WorkStatus,
}

/// Counts of a [`SyncWorker::drain`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub completed: u32,
    pub retried: u32,
    pub failed: u32,
}

/// Worker that processes the work queue.
pub struct SyncWorker {
    queue: Arc<dyn WorkQueue>,
    executor: WorkExecutor,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl SyncWorker {
    /// Create a new worker.
    pub fn new(queue: Arc<dyn WorkQueue>, executor: WorkExecutor, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the worker.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            stale_release_interval_secs = self.config.stale_release_interval_secs,
            "Starting sync worker"
        );

        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms));
        let mut stale_interval =
            interval(Duration::from_secs(self.config.stale_release_interval_secs));

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if self.is_shutdown() {
                        info!("Worker shutdown requested, stopping poll loop");
                        break;
                    }
                    self.poll_and_process().await;
                }
                _ = stale_interval.tick() => {
                    self.release_stale_work().await;
                }
            }
        }

        info!("Worker stopped");
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Process items until the queue is empty or shutdown is requested.
    ///
    /// Items that keep failing with a retryable error come back; with an
    /// unbounded queue this only returns once they succeed.
    #[instrument(skip(self))]
    pub async fn drain(&self) -> SyncResult<DrainReport> {
        let mut report = DrainReport::default();

        while !self.is_shutdown() {
            let Some(processed) = self.process_next().await? else {
                break;
            };
            match processed.status {
                WorkStatus::Completed(_) => report.completed += 1,
                WorkStatus::Retrying { .. } => report.retried += 1,
                WorkStatus::Failed { .. } => report.failed += 1,
            }
        }

        info!(
            completed = report.completed,
            retried = report.retried,
            failed = report.failed,
            "Queue drained"
        );
        Ok(report)
    }

    /// Dequeue and execute one item. Returns `None` when nothing is pending.
    pub async fn process_next(&self) -> SyncResult<Option<ProcessedWork>> {
        let Some(work) = self.queue.dequeue().await? else {
            return Ok(None);
        };
        Ok(Some(self.process(work).await))
    }

    /// Process at most the items queued when the tick fired, so re-queued
    /// failures wait for the next tick.
    async fn poll_and_process(&self) {
        let batch = match self.queue.len().await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "Failed to read queue length");
                return;
            }
        };

        for _ in 0..batch {
            if self.is_shutdown() {
                return;
            }
            match self.process_next().await {
                Ok(Some(_)) => {}
                Ok(None) => return,
                Err(e) => {
                    error!(error = %e, "Failed to dequeue work");
                    return;
                }
            }
        }
    }

    async fn release_stale_work(&self) {
        match self.queue.release_stale().await {
            Ok(0) => {}
            Ok(count) => warn!(count = count, "Released stale work items"),
            Err(e) => error!(error = %e, "Failed to release stale work"),
        }
    }

    #[instrument(skip(self, work), fields(work_id = %work.id, attempts = work.attempts))]
    async fn process(&self, work: QueuedWork) -> ProcessedWork {
        let description = work.item.description();
        debug!(description = %description, "Executing work");

        let result = tokio::time::timeout(work.time_budget, self.executor.execute(&work.item)).await;

        let status = match result {
            Ok(Ok(outcome)) => {
                info!(description = %description, outcome = ?outcome, "Work completed");
                settle(self.queue.complete(work.id).await);
                WorkStatus::Completed(outcome)
            }
            Ok(Err(e)) => {
                let retry = e.is_retryable();
                let message = e.to_string();
                if retry {
                    warn!(description = %description, error_code = e.error_code(), error = %e, "Work failed, will retry");
                } else {
                    error!(description = %description, error_code = e.error_code(), error = %e, "Work failed permanently");
                }
                settle(self.queue.fail(work.id, &message, retry).await);
                if retry {
                    WorkStatus::Retrying { error: message }
                } else {
                    WorkStatus::Failed { error: message }
                }
            }
            Err(_) => {
                let message = format!(
                    "time budget of {}s exceeded",
                    work.time_budget.as_secs()
                );
                warn!(description = %description, "Work exceeded its time budget");
                settle(self.queue.fail(work.id, &message, true).await);
                WorkStatus::Retrying { error: message }
            }
        };

        ProcessedWork {
            id: work.id,
            description,
            attempts: work.attempts,
            status,
        }
    }
}

fn settle(result: Result<(), QueueError>) {
    match result {
        Ok(()) => {}
        Err(QueueError::LeaseExpired { id }) => {
            warn!(work_id = %id, "Lease expired before the work item settled");
        }
        Err(e) => error!(error = %e, "Failed to settle work item"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.stale_release_interval_secs, 60);
    }

    #[test]
    fn test_worker_config_deserialize_defaults() {
        let config: WorkerConfig = serde_json::from_str(r#"{"poll_interval_ms": 50}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.stale_release_interval_secs, 60);
    }
}
