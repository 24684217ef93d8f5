//! Startup and the top-level task loop.
//!
//! Both the DNS interceptor and the HTTP listener run as tasks on the same
//! current-thread runtime, interleaving only at I/O suspension points.

pub mod address;
pub mod listener;

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::dns::DnsInterceptor;
use crate::http::connection::Site;

/// Bound sockets, ready to serve.
pub struct Portal {
    address: Ipv4Addr,
    dns: DnsInterceptor,
    http: TcpListener,
    site: Arc<Site>,
}

impl Portal {
    /// Resolves the portal address and binds the DNS and HTTP sockets.
    pub async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let address = address::portal_address(cfg)?;

        info!("Starting DNS server...");
        let dns = DnsInterceptor::from_config(cfg, address).await?;

        info!("Starting web server at {}:{}...", address, cfg.http_port);
        let http = listener::bind(cfg).await?;

        Ok(Self {
            address,
            dns,
            http,
            site: Arc::new(Site::new(cfg)),
        })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn dns_addr(&self) -> std::io::Result<SocketAddr> {
        self.dns.local_addr()
    }

    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// Runs both servers until `shutdown` completes. In-flight connections are
    /// abandoned rather than drained.
    pub async fn serve_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self { dns, http, site, .. } = self;

        tokio::select! {
            res = dns.run() => res,
            res = listener::run(http, site) => res,
            _ = shutdown => {
                info!("Servers stopped.");
                Ok(())
            }
        }
    }
}

/// Binds everything and blocks until Ctrl-C.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let portal = Portal::bind(cfg).await?;
    info!("...(<ctrl>+c to stop)...");

    portal
        .serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
}
