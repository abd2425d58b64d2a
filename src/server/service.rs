use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::error::{DispatchError, Result};
use crate::order::{JobId, JobRecord, JobRegistry, Lookup, Menu, Quantity};
use crate::worker::{PoolError, WorkerPool};

/// Application logic behind every connection.
///
/// Cloning is cheap; all clones share the same registry, pool and shutdown
/// state.
#[derive(Clone)]
pub struct OrderService {
    menu: Arc<Menu>,
    registry: Arc<JobRegistry>,
    pool: Arc<WorkerPool>,
    shutting_down: Arc<AtomicBool>,
    shutdown_token: CancellationToken,
}

impl OrderService {
    /// Build a service serving the standard menu. Must be called from within
    /// a tokio runtime, since the worker pool is spawned immediately.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        Self::with_menu(Menu::standard(), config)
    }

    pub fn with_menu(menu: Menu, config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        if menu.is_empty() {
            return Err(DispatchError::Config("menu has no dishes".to_string()));
        }

        Ok(Self {
            menu: Arc::new(menu),
            registry: Arc::new(JobRegistry::new()),
            pool: Arc::new(WorkerPool::new(config)),
            shutting_down: Arc::new(AtomicBool::new(false)),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Cancelled when shutdown begins; the listener and connection handlers
    /// watch it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn get_menu(&self) -> Vec<String> {
        self.menu.names()
    }

    /// Validate and queue an order, returning its identity right away.
    pub fn submit_order(&self, kind: &str, quantity: i64) -> Result<JobId> {
        self.accept_order(kind, || Quantity::try_from(quantity))
    }

    /// Same as [`OrderService::submit_order`] for a quantity straight off the
    /// wire, which may not be a number at all.
    pub fn submit_order_value(&self, kind: &str, quantity: &serde_json::Value) -> Result<JobId> {
        self.accept_order(kind, || Quantity::try_from(quantity))
    }

    fn accept_order(
        &self,
        kind: &str,
        quantity: impl FnOnce() -> Result<Quantity>,
    ) -> Result<JobId> {
        if self.is_shutting_down() {
            return Err(DispatchError::ShuttingDown);
        }

        // Validate everything before an identity is consumed.
        let dish = self.menu.lookup(kind)?;
        let quantity = quantity()?;

        let id = self
            .registry
            .submit_with(|id| {
                self.pool
                    .submit(id, dish, quantity)
                    .map(|handle| (JobRecord::new(id, dish.name.clone(), quantity), handle))
            })
            .map_err(|e| match e {
                // The intake only closes once shutdown has begun.
                PoolError::Closed => DispatchError::ShuttingDown,
                other => {
                    tracing::error!(kind = %dish.name, error = %other, "Failed to queue order");
                    DispatchError::Pool(other)
                }
            })?;

        tracing::info!(
            job_id = %id,
            kind = %dish.name,
            quantity = quantity.get(),
            "Order accepted"
        );
        Ok(id)
    }

    /// Status of an order. Ids that were never issued, including malformed
    /// ones, are reported as not found.
    pub fn query_order(&self, id: &str) -> Lookup {
        match id.parse::<JobId>() {
            Ok(job_id) => self.registry.lookup(&job_id),
            Err(_) => Lookup::NotFound,
        }
    }

    pub fn list_pending_orders(&self) -> Vec<JobId> {
        self.registry.list_pending()
    }

    /// Block until every order pending at call time is ready.
    pub async fn await_all_orders(&self) -> usize {
        self.registry.drain_all().await
    }

    /// Stop accepting connections, drain pending orders, then stop the pool.
    ///
    /// Only the first call does any work; later calls return 0.
    pub async fn shutdown(&self) -> usize {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            tracing::warn!("Shutdown already requested, ignoring");
            return 0;
        }

        tracing::info!(
            pending = self.registry.pending_count(),
            "Shutting down order service"
        );
        self.shutdown_token.cancel();

        let drained = self.await_all_orders().await;
        self.pool.shutdown().await;

        tracing::info!(
            drained,
            total_orders = self.registry.len(),
            "Order service stopped"
        );
        drained
    }
}
