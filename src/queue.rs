//! Bounded-concurrency FIFO task queue
//!
//! Ingestion submits every file load through a [`TaskQueue`] so the number
//! of in-flight reads stays capped no matter how many sources are
//! configured. Tasks are admitted strictly in submission order; completion
//! order carries no meaning. There is no cancellation and no queue-depth
//! limit; backpressure is the caller's concern.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was dropped before the task produced a result, or the task
    /// panicked. Either way no result will ever arrive for this handle.
    #[error("task queue closed before the task produced a result")]
    Closed,
}

type QueuedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handle to one submitted task. Resolves to the task's own output;
/// results are never cross-wired between submissions.
///
/// Dropping the handle does not cancel the task: once submitted, a task
/// runs to completion or failure.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map_err(|_| QueueError::Closed)
    }
}

/// FIFO scheduler admitting at most `limit` concurrently running tasks.
///
/// A dispatcher task drains the submission channel in order, acquiring a
/// semaphore permit before each spawn; the permit is released when the
/// task finishes, which immediately admits the next queued task. The
/// explicit dispatch loop (rather than each submission racing for a
/// permit) is what makes admission order deterministic.
pub struct TaskQueue {
    submit_tx: mpsc::UnboundedSender<QueuedTask>,
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl TaskQueue {
    /// Create a queue admitting at most `limit` tasks at once. A limit of
    /// zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let (submit_tx, mut submit_rx) = mpsc::unbounded_channel::<QueuedTask>();

        let dispatcher_sem = Arc::clone(&semaphore);
        tokio::spawn(async move {
            while let Some(task) = submit_rx.recv().await {
                // Closed semaphore is unreachable (nothing closes it), but
                // bail rather than unwrap if that ever changes.
                let Ok(permit) = Arc::clone(&dispatcher_sem).acquire_owned().await else {
                    break;
                };
                tokio::spawn(async move {
                    task.await;
                    drop(permit);
                });
            }
            debug!("task queue dispatcher stopped");
        });

        Self {
            submit_tx,
            semaphore,
            limit,
        }
    }

    /// Enqueue a task. It will start once every earlier submission has been
    /// admitted and a concurrency slot is free.
    ///
    /// A task that fails should return that failure as its output value;
    /// the error reaches only this submission's handle and the queue keeps
    /// draining. A panicking task likewise only poisons its own handle.
    pub fn submit<F, T>(&self, fut: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task: QueuedTask = Box::pin(async move {
            let output = fut.await;
            // The caller may have dropped its handle; that is not an error.
            let _ = tx.send(output);
        });

        if self.submit_tx.send(task).is_err() {
            // Dispatcher is gone; the handle resolves to Closed because its
            // sender was just dropped with the rejected task.
            debug!("submission after queue shutdown");
        }

        TaskHandle { rx }
    }

    /// The configured concurrency limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free. Meaningful mainly for diagnostics and tests.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
