/// Last-viewed events
///
/// Reading a sentence set enqueues a `SentenceSetViewed` event and the
/// request returns immediately. A single background worker drains the
/// queue and stamps `last_viewed_date`. Delivery is at-most-once: a full
/// queue drops the event, and recorder failures are logged and forgotten.

use chrono::{Local, NaiveDate};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

use crate::error::AppError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSetViewed {
    pub sentence_set_id: i64,
}

#[async_trait::async_trait]
pub trait LastViewedRecorder: Send + Sync {
    /// Returns `false` when no such sentence set exists
    async fn record(&self, sentence_set_id: i64, date: NaiveDate) -> Result<bool, AppError>;
}

pub struct PgLastViewedRecorder {
    pool: PgPool,
}

impl PgLastViewedRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LastViewedRecorder for PgLastViewedRecorder {
    async fn record(&self, sentence_set_id: i64, date: NaiveDate) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE sentence_set SET last_viewed_date = $1 WHERE id = $2")
            .bind(date)
            .bind(sentence_set_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Keeps the last recorded date per set in memory
#[derive(Default)]
pub struct InMemoryLastViewedRecorder {
    dates: Mutex<HashMap<i64, NaiveDate>>,
}

impl InMemoryLastViewedRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_viewed(&self, sentence_set_id: i64) -> Option<NaiveDate> {
        self.dates.lock().ok()?.get(&sentence_set_id).copied()
    }
}

#[async_trait::async_trait]
impl LastViewedRecorder for InMemoryLastViewedRecorder {
    async fn record(&self, sentence_set_id: i64, date: NaiveDate) -> Result<bool, AppError> {
        self.dates
            .lock()
            .map_err(|_| AppError::Internal("last viewed recorder lock poisoned".to_string()))?
            .insert(sentence_set_id, date);
        Ok(true)
    }
}

/// Sending half handed to request handlers
#[derive(Clone)]
pub struct ViewedEventDispatcher {
    sender: Sender<SentenceSetViewed>,
}

impl ViewedEventDispatcher {
    /// Enqueue without waiting. Returns whether the event was accepted.
    pub fn dispatch(&self, event: SentenceSetViewed) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    sentence_set_id = event.sentence_set_id,
                    "Viewed event queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    sentence_set_id = event.sentence_set_id,
                    "Viewed event worker stopped, dropping event"
                );
                false
            }
        }
    }
}

/// Start the worker. It runs until every dispatcher clone is dropped.
pub fn spawn_viewed_worker(
    recorder: Arc<dyn LastViewedRecorder>,
    capacity: usize,
) -> (ViewedEventDispatcher, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(run_worker(recorder, receiver));
    (ViewedEventDispatcher { sender }, handle)
}

async fn run_worker(recorder: Arc<dyn LastViewedRecorder>, mut receiver: Receiver<SentenceSetViewed>) {
    while let Some(event) = receiver.recv().await {
        let today = Local::now().date_naive();
        match recorder.record(event.sentence_set_id, today).await {
            Ok(true) => {
                tracing::debug!(sentence_set_id = event.sentence_set_id, "Last viewed date updated");
            }
            Ok(false) => {
                tracing::warn!(sentence_set_id = event.sentence_set_id, "Viewed event for unknown sentence set");
            }
            Err(e) => {
                tracing::error!(
                    sentence_set_id = event.sentence_set_id,
                    error = %e,
                    "Failed to update last viewed date"
                );
            }
        }
    }
    tracing::info!("Viewed event worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingRecorder {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LastViewedRecorder for FailingRecorder {
        async fn record(&self, _id: i64, _date: NaiveDate) -> Result<bool, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Internal("database down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_worker_records_today() {
        let recorder = Arc::new(InMemoryLastViewedRecorder::new());
        let (dispatcher, handle) = spawn_viewed_worker(recorder.clone(), 8);

        assert!(dispatcher.dispatch(SentenceSetViewed { sentence_set_id: 7 }));
        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(recorder.last_viewed(7), Some(Local::now().date_naive()));
        assert_eq!(recorder.last_viewed(8), None);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_worker() {
        let recorder = Arc::new(FailingRecorder { calls: AtomicUsize::new(0) });
        let (dispatcher, handle) = spawn_viewed_worker(recorder.clone(), 8);

        dispatcher.dispatch(SentenceSetViewed { sentence_set_id: 1 });
        dispatcher.dispatch(SentenceSetViewed { sentence_set_id: 2 });
        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(recorder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_full_queue_drops_event() {
        let (sender, _receiver) = mpsc::channel(1);
        let dispatcher = ViewedEventDispatcher { sender };

        assert!(dispatcher.dispatch(SentenceSetViewed { sentence_set_id: 1 }));
        assert!(!dispatcher.dispatch(SentenceSetViewed { sentence_set_id: 2 }));
    }

    #[tokio::test]
    async fn test_closed_queue_drops_event() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let dispatcher = ViewedEventDispatcher { sender };

        assert!(!dispatcher.dispatch(SentenceSetViewed { sentence_set_id: 1 }));
    }
}
