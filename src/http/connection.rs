use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

use crate::config::Config;
use crate::http::mime::classify;
use crate::http::parser::{
    is_end_of_headers, parse_header_line, parse_request_line, ParseError, MAX_HEADERS, MAX_LINE_LEN,
};
use crate::http::path::{PathResolver, ResolvedTarget};
use crate::http::request::{Method, Request};
use crate::http::response::ResponseHead;
use crate::http::writer::ResponseWriter;

/// Read-only settings every connection task shares.
#[derive(Debug, Clone)]
pub struct Site {
    pub resolver: PathResolver,
    pub chunk_size: usize,
    pub client_timeout: Duration,
}

impl Site {
    pub fn new(cfg: &Config) -> Self {
        Self {
            resolver: PathResolver::new(cfg),
            chunk_size: cfg.chunk_size,
            client_timeout: cfg.client_timeout(),
        }
    }
}

/// One accepted client, handled for exactly one request.
pub struct Connection<S> {
    stream: BufReader<S>,
    line: Vec<u8>,
    writer: ResponseWriter,
    site: Arc<Site>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseHead, Option<ResolvedTarget>),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, site: Arc<Site>) -> Self {
        Self {
            stream: BufReader::new(stream),
            line: Vec::new(),
            writer: ResponseWriter::new(site.chunk_size, site.client_timeout),
            site,
            state: ConnectionState::Reading,
        }
    }

    /// Handles the request and closes the connection whatever the outcome.
    pub async fn serve(mut self) -> anyhow::Result<()> {
        let result = self.run().await;
        self.close().await;
        result
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.reclaim();
                    let read = timeout(self.site.client_timeout, self.read_request())
                        .await
                        .context("read timeout")?;

                    match read {
                        Ok(req) => self.state = ConnectionState::Processing(req),
                        Err(ParseError::NoRequest) => {
                            self.state = ConnectionState::Closed;
                        }
                        Err(e) => {
                            return Err(anyhow::anyhow!("HTTP parse error: {}", e));
                        }
                    }
                }

                ConnectionState::Processing(req) => {
                    self.state = self.handle_request(&req).await;
                }

                ConnectionState::Writing(head, target) => {
                    self.writer.reclaim();
                    self.send(&head, target.as_ref()).await?;
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads the request line and header block, one line at a time.
    pub async fn read_request(&mut self) -> Result<Request, ParseError> {
        if self.read_line().await? == 0 {
            return Err(ParseError::NoRequest);
        }
        let request_line = parse_request_line(&self.line)?;

        let mut headers = HashMap::new();
        loop {
            if self.read_line().await? == 0 {
                return Err(ParseError::Incomplete);
            }
            if is_end_of_headers(&self.line) {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Err(ParseError::TooManyHeaders);
            }

            let (key, value) = parse_header_line(&self.line)?;
            headers.insert(key, value);
        }

        Ok(Request {
            method: request_line.method,
            path: request_line.path,
            query: request_line.query,
            version: request_line.version,
            headers,
        })
    }

    async fn handle_request(&self, req: &Request) -> ConnectionState {
        if req.method != Method::Get {
            tracing::debug!(method = ?req.method, path = %req.path, "Method not implemented");
            return ConnectionState::Writing(ResponseHead::not_implemented(), None);
        }

        let target = self.site.resolver.resolve(&req.path).await;
        let mime = classify(&target.path);

        tracing::debug!(
            path = %req.path,
            host = req.host().unwrap_or("-"),
            target = %target.path,
            redirected = target.redirected,
            content_type = mime.content_type,
            "Serving file"
        );

        ConnectionState::Writing(ResponseHead::file(mime.content_type, mime.cacheable), Some(target))
    }

    /// Opens the body before anything goes on the wire, so a file that cannot
    /// be opened leaves the client with no response at all.
    async fn send(&mut self, head: &ResponseHead, target: Option<&ResolvedTarget>) -> anyhow::Result<()> {
        let file = match target {
            Some(target) => Some(
                tokio::fs::File::open(&target.path)
                    .await
                    .with_context(|| format!("opening {}", target.path))?,
            ),
            None => None,
        };

        let stream = self.stream.get_mut();
        self.writer.write_head(stream, head).await?;

        if let (Some(target), Some(mut file)) = (target, file) {
            let sent = self.writer.stream_body(stream, &mut file).await?;
            tracing::debug!(target = %target.path, bytes = sent, "Response sent");
        } else {
            stream.flush().await?;
        }

        Ok(())
    }

    /// Reads one `\n`-terminated line into `self.line`, returning its length.
    /// Zero means the peer closed the connection.
    async fn read_line(&mut self) -> Result<usize, ParseError> {
        self.line.clear();
        let n = (&mut self.stream)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut self.line)
            .await
            .map_err(|_| ParseError::Incomplete)?;

        if n > 0 && !self.line.ends_with(b"\n") {
            return Err(if n >= MAX_LINE_LEN {
                ParseError::LineTooLong
            } else {
                ParseError::Incomplete
            });
        }

        Ok(n)
    }

    fn reclaim(&mut self) {
        self.line.clear();
        self.line.shrink_to(MAX_LINE_LEN);
        self.writer.reclaim();
    }

    pub async fn close(mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            tracing::trace!(error = %e, "Shutdown after response failed");
        }
    }
}
