//! Work queue.
//!
//! At-least-once delivery: [`WorkQueue::dequeue`] leases an item for its time
//! budget, [`WorkQueue::complete`] removes it, [`WorkQueue::fail`] re-queues
//! or dead-letters it, and [`WorkQueue::release_stale`] re-queues items whose
//! lease ran out. Enqueue is deduplicated by idempotency key against pending
//! and in-flight items.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dispatch::WorkItem;

/// Errors raised by a work queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No in-flight item with this id.
    #[error("work item {id} not found")]
    NotFound { id: Uuid },

    /// The item's lease ran out and it went back to pending.
    #[error("lease on work item {id} expired")]
    LeaseExpired { id: Uuid },

    /// The queue no longer accepts work.
    #[error("queue is closed")]
    Closed,
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// A work item with its queue bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedWork {
    pub id: Uuid,
    pub item: WorkItem,
    pub idempotency_key: String,
    /// Lease length once dequeued.
    pub time_budget: Duration,
    /// Number of times the item has been handed out.
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Result of an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted as a new item.
    Enqueued(Uuid),
    /// An item with the same idempotency key is already pending or in flight.
    Duplicate(Uuid),
}

impl EnqueueOutcome {
    /// Id of the queued item, new or existing.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            EnqueueOutcome::Enqueued(id) | EnqueueOutcome::Duplicate(id) => *id,
        }
    }
}

/// At-least-once task queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Add an item unless one with the same idempotency key is queued.
    async fn enqueue(&self, item: WorkItem, time_budget: Duration) -> QueueResult<EnqueueOutcome>;

    /// Lease the next pending item.
    async fn dequeue(&self) -> QueueResult<Option<QueuedWork>>;

    /// Remove a finished item.
    async fn complete(&self, id: Uuid) -> QueueResult<()>;

    /// Record a failure; re-queue when `retry` is set and attempts remain.
    async fn fail(&self, id: Uuid, error: &str, retry: bool) -> QueueResult<()>;

    /// Re-queue items whose lease expired. Returns how many were released.
    async fn release_stale(&self) -> QueueResult<usize>;

    /// Number of pending plus in-flight items.
    async fn len(&self) -> QueueResult<usize>;

    /// Whether nothing is pending or in flight.
    async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len().await? == 0)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<QueuedWork>,
    in_flight: HashMap<Uuid, (QueuedWork, Instant)>,
    dead: Vec<QueuedWork>,
    closed: bool,
}

impl QueueState {
    fn take_in_flight(&mut self, id: Uuid) -> QueueResult<QueuedWork> {
        if let Some((work, _)) = self.in_flight.remove(&id) {
            return Ok(work);
        }
        if self.pending.iter().any(|w| w.id == id) {
            return Err(QueueError::LeaseExpired { id });
        }
        Err(QueueError::NotFound { id })
    }

    fn find_key(&self, key: &str) -> Option<Uuid> {
        self.pending
            .iter()
            .find(|w| w.idempotency_key == key)
            .map(|w| w.id)
            .or_else(|| {
                self.in_flight
                    .values()
                    .find(|(w, _)| w.idempotency_key == key)
                    .map(|(w, _)| w.id)
            })
    }
}

/// In-process [`WorkQueue`].
///
/// No retry ceiling unless [`MemoryQueue::with_max_attempts`] sets one;
/// items over the ceiling move to the dead-letter list.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
    max_attempts: Option<u32>,
}

impl MemoryQueue {
    /// Create an unbounded-retry queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that dead-letters items after `max_attempts` attempts.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            max_attempts: Some(max_attempts),
        }
    }

    /// Stop accepting new work.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
    }

    /// Items that exhausted their attempts or failed permanently.
    pub async fn dead_letters(&self) -> Vec<QueuedWork> {
        self.state.lock().await.dead.clone()
    }

    /// Snapshot of pending items in queue order.
    pub async fn pending(&self) -> Vec<QueuedWork> {
        self.state.lock().await.pending.iter().cloned().collect()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn enqueue(&self, item: WorkItem, time_budget: Duration) -> QueueResult<EnqueueOutcome> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }

        let key = item.idempotency_key();
        if let Some(existing) = state.find_key(&key) {
            debug!(work_id = %existing, description = %item.description(), "Work already queued");
            return Ok(EnqueueOutcome::Duplicate(existing));
        }

        let id = Uuid::new_v4();
        debug!(work_id = %id, description = %item.description(), "Queued work");
        state.pending.push_back(QueuedWork {
            id,
            item,
            idempotency_key: key,
            time_budget,
            attempts: 0,
            enqueued_at: Utc::now(),
            last_error: None,
        });
        Ok(EnqueueOutcome::Enqueued(id))
    }

    async fn dequeue(&self) -> QueueResult<Option<QueuedWork>> {
        let mut state = self.state.lock().await;
        let Some(mut work) = state.pending.pop_front() else {
            return Ok(None);
        };
        work.attempts += 1;
        let deadline = Instant::now() + work.time_budget;
        state.in_flight.insert(work.id, (work.clone(), deadline));
        Ok(Some(work))
    }

    async fn complete(&self, id: Uuid) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        state.take_in_flight(id).map(|_| ())
    }

    async fn fail(&self, id: Uuid, error: &str, retry: bool) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        let mut work = state.take_in_flight(id)?;
        work.last_error = Some(error.to_string());

        let exhausted = self.max_attempts.is_some_and(|max| work.attempts >= max);
        if retry && !exhausted {
            debug!(work_id = %id, attempts = work.attempts, "Re-queued failed work");
            state.pending.push_back(work);
        } else {
            warn!(
                work_id = %id,
                attempts = work.attempts,
                error = error,
                "Moved work to dead letters"
            );
            state.dead.push(work);
        }
        Ok(())
    }

    async fn release_stale(&self) -> QueueResult<usize> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let stale: Vec<Uuid> = state
            .in_flight
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            if let Some((mut work, _)) = state.in_flight.remove(id) {
                work.last_error = Some("time budget exceeded".to_string());
                state.pending.push_back(work);
            }
        }
        Ok(stale.len())
    }

    async fn len(&self) -> QueueResult<usize> {
        let state = self.state.lock().await;
        Ok(state.pending.len() + state.in_flight.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntryId;
    use solidrock_connector::types::Collection;

    fn create(id: &str) -> WorkItem {
        WorkItem::Create {
            collection: Collection::Churches,
            remote_id: id.to_string(),
        }
    }

    const BUDGET: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_enqueue_dequeue_complete() {
        let queue = MemoryQueue::new();
        let outcome = queue.enqueue(create("1"), BUDGET).await.unwrap();
        assert!(matches!(outcome, EnqueueOutcome::Enqueued(_)));
        assert_eq!(queue.len().await.unwrap(), 1);

        let work = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(work.id, outcome.id());
        assert_eq!(work.attempts, 1);
        assert_eq!(queue.len().await.unwrap(), 1);

        queue.complete(work.id).await.unwrap();
        assert!(queue.is_empty().await.unwrap());
        assert!(queue.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_pending_and_in_flight() {
        let queue = MemoryQueue::new();
        let first = queue.enqueue(create("1"), BUDGET).await.unwrap();
        let second = queue.enqueue(create("1"), BUDGET).await.unwrap();
        assert_eq!(second, EnqueueOutcome::Duplicate(first.id()));

        let work = queue.dequeue().await.unwrap().unwrap();
        let third = queue.enqueue(create("1"), BUDGET).await.unwrap();
        assert_eq!(third, EnqueueOutcome::Duplicate(work.id));

        queue.complete(work.id).await.unwrap();
        let fourth = queue.enqueue(create("1"), BUDGET).await.unwrap();
        assert!(matches!(fourth, EnqueueOutcome::Enqueued(_)));
    }

    #[tokio::test]
    async fn test_fail_with_retry_requeues() {
        let queue = MemoryQueue::new();
        queue.enqueue(create("1"), BUDGET).await.unwrap();

        let work = queue.dequeue().await.unwrap().unwrap();
        queue.fail(work.id, "store rejected", true).await.unwrap();

        let again = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(again.id, work.id);
        assert_eq!(again.attempts, 2);
        assert_eq!(again.last_error.as_deref(), Some("store rejected"));
    }

    #[tokio::test]
    async fn test_fail_without_retry_dead_letters() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(
                WorkItem::Disable {
                    collection: Collection::Jobs,
                    entry_id: EntryId::new(3),
                },
                BUDGET,
            )
            .await
            .unwrap();

        let work = queue.dequeue().await.unwrap().unwrap();
        queue.fail(work.id, "mapping failed", false).await.unwrap();

        assert!(queue.is_empty().await.unwrap());
        assert_eq!(queue.dead_letters().await.len(), 1);
    }

    #[tokio::test]
    async fn test_max_attempts() {
        let queue = MemoryQueue::with_max_attempts(2);
        queue.enqueue(create("1"), BUDGET).await.unwrap();

        let work = queue.dequeue().await.unwrap().unwrap();
        queue.fail(work.id, "boom", true).await.unwrap();
        let work = queue.dequeue().await.unwrap().unwrap();
        queue.fail(work.id, "boom", true).await.unwrap();

        assert!(queue.dequeue().await.unwrap().is_none());
        assert_eq!(queue.dead_letters().await[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let queue = MemoryQueue::new();
        let id = Uuid::new_v4();
        assert!(matches!(queue.complete(id).await, Err(QueueError::NotFound { .. })));
        assert!(matches!(
            queue.fail(id, "x", true).await,
            Err(QueueError::NotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_stale_after_budget() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(create("1"), Duration::from_secs(10))
            .await
            .unwrap();
        let work = queue.dequeue().await.unwrap().unwrap();

        assert_eq!(queue.release_stale().await.unwrap(), 0);
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(queue.release_stale().await.unwrap(), 1);

        assert!(matches!(
            queue.complete(work.id).await,
            Err(QueueError::LeaseExpired { .. })
        ));

        let again = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(again.id, work.id);
        assert_eq!(again.attempts, 2);
    }

    #[tokio::test]
    async fn test_closed_queue_rejects() {
        let queue = MemoryQueue::new();
        queue.close().await;
        assert!(matches!(
            queue.enqueue(create("1"), BUDGET).await,
            Err(QueueError::Closed)
        ));
    }
}
