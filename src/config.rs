use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{DispatchError, Result};

/// Default number of execution slots in the worker pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Default upper bound on a single request or response line.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Largest accepted `time_scale`. At this factor a single lasagna already
/// takes close to an hour.
pub const MAX_TIME_SCALE: f64 = 1000.0;

/// Configuration for the worker pool that prepares orders.
///
/// Preparation time for one order is `base_time * quantity + jitter`, where
/// jitter is drawn uniformly from `[jitter_min, jitter_max]`. The whole figure
/// is multiplied by `time_scale`, which lets tests run the kitchen fast.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of parallel execution slots
    pub workers: usize,
    /// Multiplier applied to every simulated preparation time
    pub time_scale: f64,
    /// Lower bound of the random jitter added to each order
    pub jitter_min: Duration,
    /// Upper bound of the random jitter added to each order
    pub jitter_max: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            time_scale: 1.0,
            jitter_min: Duration::from_millis(200),
            jitter_max: Duration::from_millis(800),
        }
    }
}

impl PoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(DispatchError::Config(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if !self.time_scale.is_finite()
            || self.time_scale < 0.0
            || self.time_scale > MAX_TIME_SCALE
        {
            return Err(DispatchError::Config(format!(
                "time scale must be between 0 and {}, got {}",
                MAX_TIME_SCALE, self.time_scale
            )));
        }
        if self.jitter_min > self.jitter_max {
            return Err(DispatchError::Config(format!(
                "jitter_min ({:?}) exceeds jitter_max ({:?})",
                self.jitter_min, self.jitter_max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Longest accepted request line, in bytes
    pub max_frame_len: usize,
    pub pool: PoolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:8888"
                .parse()
                .expect("default listen address is valid"),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            pool: PoolConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_frame_len == 0 {
            return Err(DispatchError::Config(
                "max frame length must be positive".to_string(),
            ));
        }
        self.pool.validate()
    }
}
