//! TCP front end of the order-dispatch server.
//!
//! - [`OrderService`]: validation, submission, status queries, drain and
//!   shutdown
//! - [`Listener`]: accept loop, one task per connection
//! - [`connection`]: per-connection request/response loop over
//!   newline-delimited JSON

pub mod connection;
pub mod listener;
pub mod service;

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::Result;

pub use listener::Listener;
pub use service::OrderService;

/// A bound server: the service plus its listener.
pub struct OrderServer {
    listener: Listener,
    service: OrderService,
}

impl OrderServer {
    /// Validate the configuration, start the worker pool and bind the
    /// listening socket.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let service = OrderService::new(&config.pool)?;
        let listener =
            Listener::bind(config.listen_addr, service.clone(), config.max_frame_len).await?;

        tracing::info!(
            listen_addr = %listener.local_addr()?,
            workers = service.pool_capacity(),
            time_scale = config.pool.time_scale,
            "Order server bound"
        );

        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn service(&self) -> OrderService {
        self.service.clone()
    }

    /// Serve until `signal` fires (or the service is shut down some other
    /// way), then drain and release the pool. Returns the number of orders
    /// drained during shutdown.
    pub async fn run_until(self, signal: CancellationToken) -> usize {
        let service = self.service;
        let stopped = service.shutdown_token();
        let accept_loop = tokio::spawn(self.listener.run());

        tokio::select! {
            _ = signal.cancelled() => {}
            _ = stopped.cancelled() => {}
        }

        let drained = service.shutdown().await;
        if let Err(e) = accept_loop.await {
            tracing::error!(error = %e, "Accept loop ended abnormally");
        }
        drained
    }
}
