use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::server::connection::handle_connection;
use crate::server::service::OrderService;

/// Accepts connections and spawns one handler task per client.
pub struct Listener {
    listener: TcpListener,
    service: OrderService,
    max_frame_len: usize,
}

impl Listener {
    pub async fn bind(
        addr: SocketAddr,
        service: OrderService,
        max_frame_len: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            service,
            max_frame_len,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the service starts shutting down.
    pub async fn run(self) {
        let shutdown = self.service.shutdown_token();
        let addr = self.listener.local_addr().ok();

        tracing::info!(addr = ?addr, "Accepting connections");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Listener stopped accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let service = self.service.clone();
                        tokio::spawn(handle_connection(stream, peer, service, self.max_frame_len));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        // Errors such as EMFILE repeat immediately; back off.
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
        }
    }
}
