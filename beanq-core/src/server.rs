//! TCP listener that spawns one task per accepted connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::connection::Connection;
use crate::dispatch::{Dispatcher, Limits};
use crate::error::BeanqError;
use crate::stats::StatsRegistry;
use crate::store::JobStore;

/// Default listen address of the broker.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3333";

/// A bound broker listener.
///
/// Owns the process-wide [`StatsRegistry`]; every accepted connection
/// shares it through the [`Dispatcher`].
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind `addr` and build the shared registry.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<dyn JobStore>,
        limits: Limits,
    ) -> Result<Self, BeanqError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BeanqError::Bind { addr, source })?;
        let stats = Arc::new(StatsRegistry::new());

        Ok(Self {
            listener,
            dispatcher: Dispatcher::new(stats, store, limits),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BeanqError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<StatsRegistry> {
        Arc::clone(self.dispatcher.stats())
    }

    /// Accept connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        if let Ok(addr) = self.listener.local_addr() {
            info!("listening on {addr}");
        }

        loop {
            let accept = tokio::select! {
                result = self.listener.accept() => result,
                _ = &mut shutdown => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            // Counted here, before the task starts, so the connection
            // shows up in `stats` as soon as it is accepted.
            let conn = Connection::new(stream, self.dispatcher.clone(), peer.to_string());
            tokio::spawn(conn.run());
        }

        info!("listener stopped");
    }
}
