//! End-to-end request handling over in-memory streams

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use captive::config::Config;
use captive::http::connection::{Connection, Site};
use captive::http::parser::MAX_HEADERS;
use captive::http::writer::ResponseWriter;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

const CHUNK: usize = 512;

fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

struct Fixture {
    dir: tempfile::TempDir,
    site: Arc<Site>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), patterned(1300, 1)).unwrap();
    std::fs::write(dir.path().join("captive.html"), b"<h1>Welcome to the portal</h1>").unwrap();
    std::fs::write(dir.path().join("style.css"), b"body { color: red }").unwrap();
    std::fs::write(dir.path().join("a.png"), patterned(5000, 7)).unwrap();
    std::fs::write(dir.path().join("b.pdf"), patterned(7100, 99)).unwrap();

    let mut cfg = Config::new(dir.path().to_str().unwrap(), "index.html", 80);
    cfg.chunk_size = CHUNK;
    cfg.client_timeout_secs = 1;

    Fixture {
        site: Arc::new(Site::new(&cfg)),
        dir,
    }
}

/// Sends `request`, returns everything the server wrote and its result.
async fn exchange(site: Arc<Site>, request: &[u8], pipe: usize) -> (Vec<u8>, anyhow::Result<()>) {
    let (mut client, server) = tokio::io::duplex(pipe);
    let handle = tokio::spawn(Connection::new(server, site).serve());

    let _ = client.write_all(request).await;
    let _ = client.shutdown().await;
    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();

    (response, handle.await.unwrap())
}

fn split_response(response: &[u8]) -> (String, Vec<u8>) {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no end of headers");
    (
        String::from_utf8(response[..end + 4].to_vec()).unwrap(),
        response[end + 4..].to_vec(),
    )
}

#[tokio::test]
async fn test_get_root_serves_default_document() {
    let fx = fixture();
    let (response, result) = exchange(fx.site.clone(), b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n", 4096).await;
    result.unwrap();

    let (head, body) = split_response(&response);
    assert_eq!(head, "HTTP/1.0 200 OK\r\nContent-Type: text/html\r\n\r\n");
    assert_eq!(body, std::fs::read(fx.dir.path().join("index.html")).unwrap());
}

#[tokio::test]
async fn test_missing_resource_serves_captive_page() {
    let fx = fixture();
    let (response, result) =
        exchange(fx.site.clone(), b"GET /generate_204 HTTP/1.1\r\nHost: connectivitycheck.gstatic.com\r\n\r\n", 4096).await;
    result.unwrap();

    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(!head.contains("404"));
    assert!(head.contains("Content-Type: text/html\r\n"));
    assert_eq!(body, b"<h1>Welcome to the portal</h1>".to_vec());
}

#[tokio::test]
async fn test_cacheable_asset_gets_cache_control() {
    let fx = fixture();
    let (response, result) = exchange(fx.site.clone(), b"GET /style.css?v=2 HTTP/1.1\r\n\r\n", 4096).await;
    result.unwrap();

    let (head, body) = split_response(&response);
    assert_eq!(
        head,
        "HTTP/1.0 200 OK\r\nContent-Type: text/css\r\nCache-Control: public, max-age=604800, immutable\r\n\r\n"
    );
    assert_eq!(body, b"body { color: red }".to_vec());
}

#[tokio::test]
async fn test_post_is_not_implemented() {
    let fx = fixture();
    let (response, result) = exchange(
        fx.site.clone(),
        b"POST /login HTTP/1.1\r\nHost: portal\r\nContent-Length: 3\r\n\r\nabc",
        4096,
    )
    .await;
    result.unwrap();

    assert_eq!(response, b"HTTP/1.0 500 Not Implemented\r\n\r\n".to_vec());
}

#[tokio::test]
async fn test_malformed_header_aborts_without_response() {
    let fx = fixture();
    let (response, result) = exchange(fx.site.clone(), b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n", 4096).await;

    assert!(result.is_err());
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_headers_cut_short_abort_without_response() {
    let fx = fixture();
    let (response, result) = exchange(fx.site.clone(), b"GET / HTTP/1.1\r\nHost: x\r\n", 4096).await;

    assert!(result.is_err());
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_empty_request_closes_quietly() {
    let fx = fixture();
    let (response, result) = exchange(fx.site.clone(), b"", 4096).await;

    result.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_blank_request_line_is_not_implemented() {
    let fx = fixture();
    let (response, result) = exchange(fx.site.clone(), b"\r\n\r\n", 4096).await;
    result.unwrap();

    assert_eq!(response, b"HTTP/1.0 500 Not Implemented\r\n\r\n".to_vec());
}

#[tokio::test]
async fn test_too_many_headers_aborts_without_response() {
    let fx = fixture();
    let mut request = b"GET / HTTP/1.1\r\n".to_vec();
    for i in 0..=MAX_HEADERS {
        request.extend_from_slice(format!("X-Filler-{}: {}\r\n", i, "v".repeat(64)).as_bytes());
    }
    request.extend_from_slice(b"\r\n");

    let (response, result) = exchange(fx.site.clone(), &request, 16384).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("header lines"), "{}", err);
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_header_limit_is_inclusive() {
    let fx = fixture();
    let mut request = b"GET /style.css HTTP/1.1\r\n".to_vec();
    for i in 0..MAX_HEADERS {
        request.extend_from_slice(format!("X-Filler-{}: v\r\n", i).as_bytes());
    }
    request.extend_from_slice(b"\r\n");

    let (response, result) = exchange(fx.site.clone(), &request, 16384).await;
    result.unwrap();

    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
    assert_eq!(body, b"body { color: red }".to_vec());
}

#[tokio::test]
async fn test_missing_captive_page_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::new(dir.path().to_str().unwrap(), "index.html", 80);
    let site = Arc::new(Site::new(&cfg));

    let (response, result) = exchange(site, b"GET /x HTTP/1.1\r\n\r\n", 4096).await;

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("captive.html"), "{:#}", err);
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_overlong_line_aborts() {
    let fx = fixture();
    let mut request = b"GET /".to_vec();
    request.extend(std::iter::repeat_n(b'a', 3000));
    request.extend_from_slice(b" HTTP/1.1\r\n\r\n");

    let (response, result) = exchange(fx.site.clone(), &request, 8192).await;

    assert!(result.is_err());
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_silent_client_times_out() {
    let fx = fixture();
    let (client, server) = tokio::io::duplex(1024);

    let result = Connection::new(server, fx.site.clone()).serve().await;

    assert!(result.is_err());
    drop(client);
}

#[tokio::test]
async fn test_concurrent_connections_do_not_mix_bodies() {
    let fx = fixture();
    let a = exchange(fx.site.clone(), b"GET /a.png HTTP/1.1\r\n\r\n", 64);
    let b = exchange(fx.site.clone(), b"GET /b.pdf HTTP/1.1\r\n\r\n", 64);

    let ((resp_a, res_a), (resp_b, res_b)) = tokio::join!(a, b);
    res_a.unwrap();
    res_b.unwrap();

    let (head_a, body_a) = split_response(&resp_a);
    let (head_b, body_b) = split_response(&resp_b);
    assert!(head_a.contains("Content-Type: image/png"));
    assert!(head_b.contains("Content-Type: application/pdf"));
    assert_eq!(body_a, patterned(5000, 7));
    assert_eq!(body_b, patterned(7100, 99));
}

/// Stream that replays a request and records the size of every write.
struct RecordingStream {
    request: io::Cursor<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<Vec<usize>>>,
}

impl AsyncRead for RecordingStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.request).poll_read(cx, buf)
    }
}

impl AsyncWrite for RecordingStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.written.lock().unwrap().extend_from_slice(buf);
        self.writes.lock().unwrap().push(buf.len());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_body_is_streamed_in_bounded_chunks() {
    let fx = fixture();
    let written = Arc::new(Mutex::new(Vec::new()));
    let writes = Arc::new(Mutex::new(Vec::new()));
    let stream = RecordingStream {
        request: io::Cursor::new(b"GET / HTTP/1.1\r\n\r\n".to_vec()),
        written: written.clone(),
        writes: writes.clone(),
    };

    Connection::new(stream, fx.site.clone()).serve().await.unwrap();

    let expected = std::fs::read(fx.dir.path().join("index.html")).unwrap();
    let written = written.lock().unwrap();
    let (head, body) = split_response(&written);
    assert_eq!(body, expected);

    // first write is the head, the rest is body
    let writes = writes.lock().unwrap();
    assert_eq!(writes[0], head.len());
    let body_writes = &writes[1..];
    assert!(body_writes.iter().all(|&n| n <= CHUNK));
    assert_eq!(body_writes.iter().sum::<usize>(), expected.len());
}

#[tokio::test]
async fn test_response_writer_streams_whole_source() {
    let source = patterned(2049, 3);
    let mut writer = ResponseWriter::new(256, std::time::Duration::from_secs(1));
    let mut sink = Vec::new();

    let sent = writer
        .stream_body(&mut sink, &mut source.as_slice())
        .await
        .unwrap();

    assert_eq!(writer.chunk_size(), 256);
    assert_eq!(sent, 2049);
    assert_eq!(sink, source);
}
