#![allow(dead_code)]

use async_downloader::{Downloader, DownloaderBuilder, Status, Transport};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Common test constants
pub const TEST_USER_AGENT: &str = "async-downloader-test/1.0";

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Asserts that a file has the expected content
pub fn assert_file_content(path: &Path, expected: &[u8]) {
    let content = fs::read(path).expect("Failed to read downloaded file");
    assert_eq!(content.len(), expected.len(), "File size mismatch at {:?}", path);
    assert!(content == expected, "File content mismatch at {:?}", path);
}

/// Initializes a test subscriber honoring RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// === HTTP fixtures ===

/// Serves `body` at `route` on a fresh mock server.
pub async fn serve_bytes(route: &str, body: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

/// Answers `route` with the given status and no body.
pub async fn serve_status(route: &str, status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

/// Starts a server that answers every request with a body trickled out in
/// `chunks` writes of `chunk_size` bytes, one every `interval`.
///
/// Returns the base URL (`http://127.0.0.1:<port>`).
pub async fn dribble_server(chunk_size: usize, interval: Duration, chunks: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind dribble server");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    chunk_size * chunks
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }

                let chunk = vec![b'x'; chunk_size];
                for _ in 0..chunks {
                    tokio::time::sleep(interval).await;
                    if socket.write_all(&chunk).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    format!("http://{}", addr)
}

// === Downloader helpers ===

/// Builds a downloader for `url` writing into `dir`.
pub fn downloader_for(url: &str, dir: &Path) -> Downloader {
    DownloaderBuilder::new()
        .url(url)
        .directory(dir)
        .build()
        .expect("Failed to build downloader")
}

/// Builds a downloader for `url` writing into `dir`, on a shared transport.
pub fn shared_downloader_for(url: &str, dir: &Path, transport: &Transport) -> Downloader {
    DownloaderBuilder::new()
        .url(url)
        .directory(dir)
        .transport(transport.clone())
        .build()
        .expect("Failed to build downloader")
}

/// Polls until the downloader has written at least one chunk.
pub async fn wait_for_bytes(dl: &Downloader) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while dl.total_bytes() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Transfer never started streaming");
}

/// Waits for a terminal state, failing the test if it takes too long.
pub async fn wait_terminal(dl: &Downloader) -> Status {
    tokio::time::timeout(Duration::from_secs(30), dl.wait())
        .await
        .expect("Download did not reach a terminal state in time")
        .expect("Download was never started")
}

/// Asserts the download aborted and returns its reason.
pub fn assert_aborted(dl: &Downloader) -> String {
    assert!(dl.is_aborted(), "expected aborted, got {:?}", dl.status());
    assert!(!dl.is_finished());
    let reason = dl.abort_reason().expect("aborted without a reason");
    assert!(!reason.is_empty());
    reason
}
