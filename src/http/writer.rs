use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::response::ResponseHead;

const HTTP_VERSION: &str = "HTTP/1.0";
const HEAD_RETAIN: usize = 256;

/// Serializes the status line, headers and terminating blank line into `buf`.
pub fn serialize_head(head: &ResponseHead, buf: &mut Vec<u8>) {
    buf.clear();

    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        head.status.as_u16(),
        head.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in &head.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
}

/// Writes response heads and streams bodies through one fixed-size buffer.
///
/// The chunk buffer is allocated once and reused for the whole connection, so
/// streaming a file never allocates.
pub struct ResponseWriter {
    head_buf: Vec<u8>,
    chunk: Box<[u8]>,
    write_timeout: Duration,
}

impl ResponseWriter {
    pub fn new(chunk_size: usize, write_timeout: Duration) -> Self {
        Self {
            head_buf: Vec::new(),
            chunk: vec![0u8; chunk_size].into_boxed_slice(),
            write_timeout,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk.len()
    }

    /// Gives back whatever the head buffer grew to beyond its usual size.
    pub fn reclaim(&mut self) {
        self.head_buf.clear();
        self.head_buf.shrink_to(HEAD_RETAIN);
    }

    pub async fn write_head<W>(&mut self, stream: &mut W, head: &ResponseHead) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        serialize_head(head, &mut self.head_buf);
        timeout(self.write_timeout, stream.write_all(&self.head_buf))
            .await
            .context("write timeout")?
            .context("writing response head")?;
        Ok(())
    }

    /// Copies `source` to `stream` one chunk at a time, each chunk written
    /// before the next is read. Returns the number of body bytes sent.
    pub async fn stream_body<W, R>(&mut self, stream: &mut W, source: &mut R) -> anyhow::Result<u64>
    where
        W: AsyncWrite + Unpin,
        R: AsyncRead + Unpin,
    {
        let mut sent = 0u64;

        loop {
            let n = source
                .read(&mut self.chunk)
                .await
                .context("reading file")?;

            if n == 0 {
                break;
            }

            timeout(self.write_timeout, stream.write_all(&self.chunk[..n]))
                .await
                .context("write timeout")?
                .context("writing response body")?;

            sent += n as u64;
        }

        stream.flush().await?;
        Ok(sent)
    }
}
