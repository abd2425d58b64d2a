//! Worker execution engine for preparing orders.
//!
//! - **Pool**: a fixed number of long-lived workers fed by one FIFO queue
//! - **Executor**: simulates the variable-duration preparation of one order
//!
//! # Components
//!
//! - [`WorkerPool`]: accepts orders without blocking and hands back a
//!   [`JobHandle`]
//! - [`JobExecutor`]: computes `base_time * quantity + jitter` and sleeps it off
//!
//! # Execution Flow
//!
//! 1. [`WorkerPool::submit`] enqueues the order and returns a handle
//! 2. The next idle worker dequeues it and runs [`JobExecutor::execute`]
//! 3. The worker publishes a [`PrepResult`](crate::order::PrepResult) through
//!    the handle's completion channel
//! 4. Callers observe completion with [`JobHandle::is_done`] or
//!    [`JobHandle::await_result`]

pub mod executor;
pub mod pool;

pub use executor::JobExecutor;
pub use pool::{completion_pair, Completion, JobHandle, PoolError, WorkerPool};
