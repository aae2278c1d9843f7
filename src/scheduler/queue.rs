//! Unbounded FIFO intake of album jobs with a stop sentinel.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors returned when submitting jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue was shut down; no further jobs are accepted.
    #[error("job queue is closed; '{url}' was not queued")]
    Closed {
        /// The rejected album URL.
        url: String,
    },
}

/// One album URL awaiting processing. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumJob {
    /// The album URL as submitted.
    pub source_url: String,
}

#[derive(Debug)]
enum Message {
    Job(AlbumJob),
    Stop,
}

/// Cloneable submission handle.
///
/// Clones share one sender slot; [`JobSender::shutdown`] empties it, so a
/// submission either lands ahead of the stop sentinel or is rejected.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
}

impl JobSender {
    /// Queues `url` behind every job submitted before it.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] after [`JobSender::shutdown`] or once the
    /// receiving side is gone.
    pub fn submit(&self, url: impl Into<String>) -> Result<(), QueueError> {
        let url = url.into();
        let slot = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = slot.as_ref() else {
            return Err(QueueError::Closed { url });
        };
        debug!(url = %url, "queued album job");
        tx.send(Message::Job(AlbumJob { source_url: url }))
            .map_err(|rejected| match rejected.0 {
                Message::Job(job) => QueueError::Closed {
                    url: job.source_url,
                },
                Message::Stop => QueueError::Closed { url: String::new() },
            })
    }

    /// Enqueues the stop sentinel. Jobs already queued are still processed;
    /// later submissions are rejected. Calling it twice is harmless.
    pub fn shutdown(&self) {
        let taken = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = taken {
            debug!("job queue shutting down");
            let _ = tx.send(Message::Stop);
        }
    }

    /// Returns true once [`JobSender::shutdown`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Receiving side, drained by a single dispatcher.
#[derive(Debug)]
pub struct JobQueue {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl JobQueue {
    /// Creates a queue and its first submission handle.
    #[must_use]
    pub fn new() -> (JobSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = JobSender {
            tx: Arc::new(Mutex::new(Some(tx))),
        };
        (sender, Self { rx })
    }

    /// Waits for the next job in submission order.
    ///
    /// Returns `None` at the stop sentinel or when every sender is gone.
    pub async fn next(&mut self) -> Option<AlbumJob> {
        match self.rx.recv().await {
            Some(Message::Job(job)) => Some(job),
            Some(Message::Stop) | None => {
                self.rx.close();
                None
            }
        }
    }
}
