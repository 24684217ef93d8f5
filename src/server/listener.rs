use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::{Connection, Site};

pub async fn bind(cfg: &Config) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from((cfg.bind_ip, cfg.http_port));
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {}", addr))
}

/// Accepts connections forever, one task per connection.
pub async fn run(listener: TcpListener, site: Arc<Site>) -> anyhow::Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", peer);

        let site = site.clone();
        tokio::spawn(async move {
            let conn = Connection::new(socket, site);
            if let Err(e) = conn.serve().await {
                tracing::warn!("Connection error from {}: {:#}", peer, e);
            }
        });
    }
}
