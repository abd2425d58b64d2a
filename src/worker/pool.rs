//! Fixed-size pool of workers that prepare orders in the background.
//!
//! All workers pull from one shared FIFO queue, so when every slot is busy
//! new orders wait in submission order until a worker frees up. Nothing is
//! dropped: on shutdown the intake closes and workers finish whatever is
//! already queued before exiting.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::PoolConfig;
use crate::order::{Dish, JobId, PrepResult, Quantity};
use crate::worker::executor::JobExecutor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,

    #[error("no worker is left to complete the order")]
    WorkerLost,
}

/// Create a connected completion/handle pair for one order.
pub fn completion_pair() -> (Completion, JobHandle) {
    let (tx, rx) = watch::channel(None);
    (Completion { tx }, JobHandle { rx })
}

/// Write side of a job's completion; consumed when the result is published.
#[derive(Debug)]
pub struct Completion {
    tx: watch::Sender<Option<PrepResult>>,
}

impl Completion {
    pub fn complete(self, result: PrepResult) {
        // send_replace stores the value even when no handle is listening.
        self.tx.send_replace(Some(result));
    }
}

/// Pollable, awaitable reference to an order being prepared.
#[derive(Debug, Clone)]
pub struct JobHandle {
    rx: watch::Receiver<Option<PrepResult>>,
}

impl JobHandle {
    /// Non-blocking completion check.
    pub fn is_done(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Non-blocking peek at the result, if one has been published.
    pub fn result(&self) -> Option<PrepResult> {
        self.rx.borrow().clone()
    }

    /// Wait until the worker publishes a result.
    pub async fn await_result(&self) -> Result<PrepResult, PoolError> {
        let mut rx = self.rx.clone();
        let result = match rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        result.ok_or(PoolError::WorkerLost)
    }
}

struct WorkItem {
    job_id: JobId,
    dish: Dish,
    quantity: Quantity,
    completion: Completion,
}

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<WorkItem>>>;

pub struct WorkerPool {
    intake: Mutex<Option<mpsc::UnboundedSender<WorkItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
}

impl WorkerPool {
    /// Spawn `config.workers` workers on the current tokio runtime.
    pub fn new(config: &PoolConfig) -> Self {
        let capacity = config.workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let queue: SharedQueue = Arc::new(tokio::sync::Mutex::new(rx));
        let executor = JobExecutor::new(config);

        let workers = (1..=capacity)
            .map(|n| {
                let name = format!("worker-{}", n);
                tokio::spawn(Self::worker_loop(name, queue.clone(), executor.clone()))
            })
            .collect();

        tracing::info!(capacity, "Worker pool started");

        Self {
            intake: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue an order for preparation. Never blocks on execution.
    pub fn submit(
        &self,
        job_id: JobId,
        dish: &Dish,
        quantity: Quantity,
    ) -> Result<JobHandle, PoolError> {
        let intake = self.intake.lock();
        let tx = intake.as_ref().ok_or(PoolError::Closed)?;

        let (completion, handle) = completion_pair();
        tx.send(WorkItem {
            job_id,
            dish: dish.clone(),
            quantity,
            completion,
        })
        // The receiver only goes away when every worker has died.
        .map_err(|_| PoolError::WorkerLost)?;

        tracing::debug!(job_id = %job_id, kind = %dish.name, "Order queued");
        Ok(handle)
    }

    /// Close the intake, let workers finish queued orders, and join them.
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        drop(self.intake.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }
        tracing::info!(capacity = self.capacity, "Worker pool stopped");
    }

    async fn worker_loop(name: String, queue: SharedQueue, executor: JobExecutor) {
        tracing::debug!(worker = %name, "Worker started");

        loop {
            // The queue lock is fair, so idle workers take turns in FIFO order.
            let item = {
                let mut rx = queue.lock().await;
                rx.recv().await
            };
            let Some(item) = item else {
                break;
            };

            let result = executor
                .execute(&name, item.job_id, &item.dish, item.quantity)
                .await;
            item.completion.complete(result);
        }

        tracing::debug!(worker = %name, "Worker stopped");
    }
}
