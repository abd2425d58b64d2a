use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;

use crate::config::PoolConfig;
use crate::order::{Dish, JobId, PrepResult, Quantity};

/// Simulates preparing an order.
///
/// The planned duration is `base_time * quantity + jitter`, scaled by the
/// configured time scale. Execution never fails: the worker always comes back
/// with a result.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    time_scale: f64,
    jitter_min: Duration,
    jitter_max: Duration,
}

impl JobExecutor {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            time_scale: config.time_scale,
            jitter_min: config.jitter_min,
            jitter_max: config.jitter_max,
        }
    }

    /// Deterministic part of the preparation time, given an explicit jitter.
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn planned_duration(&self, dish: &Dish, quantity: Quantity, jitter: Duration) -> Duration {
        let unscaled = dish
            .base_time
            .checked_mul(quantity.get())
            .and_then(|base| base.checked_add(jitter))
            .unwrap_or(Duration::MAX);
        Duration::try_from_secs_f64(unscaled.as_secs_f64() * self.time_scale)
            .unwrap_or(Duration::MAX)
    }

    fn sample_jitter(&self) -> Duration {
        if self.jitter_min >= self.jitter_max {
            return self.jitter_min;
        }
        rand::rng().random_range(self.jitter_min..=self.jitter_max)
    }

    /// Prepare one order on behalf of `worker`.
    pub async fn execute(
        &self,
        worker: &str,
        job_id: JobId,
        dish: &Dish,
        quantity: Quantity,
    ) -> PrepResult {
        let planned = self.planned_duration(dish, quantity, self.sample_jitter());

        tracing::info!(
            job_id = %job_id,
            worker,
            kind = %dish.name,
            quantity = quantity.get(),
            planned_ms = planned.as_millis() as u64,
            "Preparing order"
        );

        let started = Instant::now();
        tokio::time::sleep(planned).await;
        let duration = started.elapsed();

        tracing::info!(
            job_id = %job_id,
            worker,
            elapsed_ms = duration.as_millis() as u64,
            "Order ready"
        );

        PrepResult {
            duration,
            worker: worker.to_string(),
            completed_at: Utc::now(),
        }
    }
}
