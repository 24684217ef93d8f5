use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use tokio::net::UdpSocket;

use crate::config::Config;
use crate::dns::query::{answer_query, DropReason};

const MAX_DATAGRAM: usize = 1024;

/// What happened to one datagram. The receive loop treats both the same way.
#[derive(Debug)]
pub enum DnsOutcome {
    Answered { domain: String },
    Dropped(DropReason),
}

/// Answers every standard query with the portal's own address.
pub struct DnsInterceptor {
    socket: UdpSocket,
    answer: Ipv4Addr,
    ttl: u32,
    poll_interval: Duration,
}

impl DnsInterceptor {
    pub async fn bind(
        addr: SocketAddr,
        answer: Ipv4Addr,
        ttl: u32,
        poll_interval: Duration,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("binding DNS socket on {}", addr))?;

        Ok(Self {
            socket,
            answer,
            ttl,
            poll_interval,
        })
    }

    pub async fn from_config(cfg: &Config, answer: Ipv4Addr) -> anyhow::Result<Self> {
        let addr = SocketAddr::from((cfg.bind_ip, cfg.dns_port));
        Self::bind(addr, answer, cfg.dns_ttl, cfg.dns_poll_interval()).await
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Polls the socket forever. When nothing is pending, sleeps for the poll
    /// interval before trying again. No datagram can end the loop.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(answer = %self.answer, "DNS interceptor running");
        let mut buf = [0u8; MAX_DATAGRAM];

        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((n, peer)) => {
                    match self.handle_datagram(&buf[..n], peer).await {
                        DnsOutcome::Answered { domain } => {
                            tracing::debug!(%peer, %domain, answer = %self.answer, "DNS query answered");
                        }
                        DnsOutcome::Dropped(reason) => {
                            tracing::debug!(%peer, %reason, "DNS datagram dropped");
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "DNS receive failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    pub async fn handle_datagram(&self, data: &[u8], peer: SocketAddr) -> DnsOutcome {
        let (domain, response) = match answer_query(data, self.answer, self.ttl) {
            Ok(answer) => answer,
            Err(reason) => return DnsOutcome::Dropped(reason),
        };

        match self.socket.send_to(&response, peer).await {
            Ok(_) => DnsOutcome::Answered { domain },
            Err(e) => DnsOutcome::Dropped(DropReason::Send(e)),
        }
    }
}
