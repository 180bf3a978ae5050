//! Rebuild Pool Module
//!
//! A bounded worker pool for background cache rebuilds.
//!
//! The logical-expiration loader hands refresh work to this pool so that a
//! storm of expired hot keys cannot exhaust request-handling capacity: the
//! worker count caps concurrent rebuilds and the queue caps pending ones.
//! Submission is non-blocking; a full queue rejects the task and the caller
//! decides what to do (the loader releases its rebuild lock and moves on).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type RebuildTask = Pin<Box<dyn Future<Output = ()> + Send>>;

// == Rebuild Pool ==
/// Fixed-size worker pool with a bounded submission queue.
///
/// Tasks that start always run to completion; there is no cancellation path.
/// Constructed explicitly and injected where needed, never a process-wide
/// singleton.
#[derive(Debug)]
pub struct RebuildPool {
    sender: mpsc::Sender<RebuildTask>,
    workers: Vec<JoinHandle<()>>,
}

impl RebuildPool {
    // == Constructor ==
    /// Creates a pool with `workers` worker tasks and room for `queue_depth`
    /// pending rebuilds.
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<RebuildTask>(queue_depth.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    debug!(worker_id, "rebuild worker started");
                    loop {
                        // Hold the receiver lock only while waiting, not while
                        // running the task, so workers drain in parallel.
                        let task = { receiver.lock().await.recv().await };
                        match task {
                            Some(task) => task.await,
                            None => break,
                        }
                    }
                    debug!(worker_id, "rebuild worker stopped");
                })
            })
            .collect();

        info!(workers, queue_depth, "rebuild pool started");
        Self {
            sender,
            workers: handles,
        }
    }

    // == Try Submit ==
    /// Queues a rebuild without blocking.
    ///
    /// Returns false if the queue is full (the task is dropped).
    pub fn try_submit<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.sender.try_send(Box::pin(task)).is_ok()
    }

    // == Shutdown ==
    /// Stops accepting work and waits for queued rebuilds to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        for handle in self.workers {
            let _ = handle.await;
        }
    }
}
