//! TCP accept loop
//!
//! A single acceptor task: accepted connections become [`HeaderJob`]s
//! on the bounded header channel. The send blocks when the router pool
//! is saturated, which transitively applies TCP backpressure to the
//! agents. Cancellation exits the loop and drops the listener socket;
//! there is no shared "keep accepting" flag to race on.

use crossfire::MAsyncTx;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::ServerError;
use crate::jobs::HeaderJob;

/// Bound ingestion listener
#[derive(Debug)]
pub struct Listener {
    address: String,
    inner: TcpListener,
}

impl Listener {
    /// Bind the ingestion address; failure here is fatal
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let inner = TcpListener::bind(address)
            .await
            .map_err(|e| ServerError::Bind {
                address: address.to_string(),
                source: e,
            })?;
        tracing::info!(address, "listening");
        Ok(Self {
            address: address.to_string(),
            inner,
        })
    }

    /// The address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept until cancelled, enqueueing header jobs
    ///
    /// Consumes the header sender: when this returns, the channel's
    /// producer side is gone and the router pool starts draining.
    pub async fn run(self, header_tx: MAsyncTx<HeaderJob>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.inner.accept() => match result {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
                        }
                        if header_tx.send(HeaderJob { stream, peer }).await.is_err() {
                            // Router pool is gone; nothing left to accept for.
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept error");
                    }
                }
            }
        }

        tracing::info!(address = %self.address, "listener stopped");
    }
}

#[cfg(test)]
#[path = "listener_test.rs"]
mod listener_test;
