//! End-to-end tests for the worker pools
//!
//! Each test stands up the real pipeline (channels, router, dumper,
//! logrotater, registry) against a listener on an ephemeral port and
//! drives it with a plain TCP client.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use carrier_logio::{BuffererFactory, RawBufferer, Root};

use crate::jobs::{DumpJob, HeaderJob, LogrotateJob};
use crate::metrics::PoolMetrics;
use crate::pools::{DumpPool, LogrotatePool, RouterContext, RouterPool, default_namer};
use crate::registry::FileRegistry;

struct Pipeline {
    registry: Arc<FileRegistry>,
    router: RouterPool,
    dumper: DumpPool,
    logrotater: LogrotatePool,
    header_tx: crossfire::MAsyncTx<HeaderJob>,
    listener: TcpListener,
    address: std::net::SocketAddr,
    metrics: Arc<PoolMetrics>,
}

fn raw_factory(root: Root) -> BuffererFactory {
    Box::new(move |key: &str| {
        let file = root.open(key)?;
        Ok(Box::new(RawBufferer::new(file, 64 * 1024)) as Box<dyn carrier_logio::Bufferer>)
    })
}

async fn pipeline_over(dir: &TempDir) -> Pipeline {
    let root = Root::new(dir.path(), 0o755);
    let registry = Arc::new(FileRegistry::new(raw_factory(root.clone())));

    let (header_tx, header_rx) = crossfire::mpmc::bounded_async::<HeaderJob>(8);
    let (dump_tx, dump_rx) = crossfire::mpmc::bounded_async::<DumpJob>(8);
    let (rotate_tx, rotate_rx) = crossfire::mpmc::bounded_async::<LogrotateJob>(8);

    let metrics = Arc::new(PoolMetrics::new());
    let router = RouterPool::spawn(
        2,
        RouterContext {
            root,
            namer: default_namer(),
            dump_tx,
            rotate_tx,
            metrics: Arc::clone(&metrics),
        },
        header_rx,
    );
    let dumper = DumpPool::spawn(
        2,
        Arc::clone(&registry),
        dump_rx,
        Duration::from_secs(1),
        Arc::new(PoolMetrics::new()),
    );
    let logrotater = LogrotatePool::spawn(
        1,
        Arc::clone(&registry),
        rotate_rx,
        Duration::from_secs(1),
        Arc::new(PoolMetrics::new()),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    Pipeline {
        registry,
        router,
        dumper,
        logrotater,
        header_tx,
        listener,
        address,
        metrics,
    }
}

impl Pipeline {
    /// Accept one connection and hand it to the router pool
    async fn route_one(&self) {
        let (stream, peer) = self.listener.accept().await.unwrap();
        self.header_tx
            .send(HeaderJob { stream, peer })
            .await
            .unwrap();
    }

    /// Drop the senders and drain every pool
    async fn shutdown(self) -> Arc<FileRegistry> {
        drop(self.header_tx);
        self.router.join().await;
        self.dumper.join().await;
        self.logrotater.join().await;
        self.registry
    }
}

/// Send one request and return the server's response bytes
async fn request(address: std::net::SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(address).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_dump_lands_in_destination_file() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_over(&dir).await;
    let address = pipeline.address;

    let client = tokio::spawn(async move {
        request(address, b"DUMP web app.log\nhello\nworld\n").await
    });
    pipeline.route_one().await;
    assert_eq!(client.await.unwrap(), b"200 OK\n");

    let registry = pipeline.shutdown().await;
    registry
        .get_file("web/app.log")
        .unwrap()
        .bufferer()
        .lock()
        .await
        .close()
        .unwrap();

    assert_eq!(
        std::fs::read(dir.path().join("web/app.log")).unwrap(),
        b"hello\nworld\n"
    );
}

#[tokio::test]
async fn test_rotate_after_dump() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_over(&dir).await;
    let address = pipeline.address;

    let client = tokio::spawn(async move {
        request(address, b"DUMP web app.log\nfirst\n").await
    });
    pipeline.route_one().await;
    assert_eq!(client.await.unwrap(), b"200 OK\n");

    let client = tokio::spawn(async move {
        request(address, b"ROTATE web app.log\n").await
    });
    pipeline.route_one().await;
    assert_eq!(client.await.unwrap(), b"200 OK\n");

    pipeline.shutdown().await;

    // The rotated file carries the bytes under a timestamped name; the
    // live path is back and empty.
    let entries: Vec<String> = std::fs::read_dir(dir.path().join("web"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let rotated = entries
        .iter()
        .find(|name| name.starts_with("app.log-"))
        .expect("no rotated file");

    assert_eq!(
        std::fs::read(dir.path().join("web").join(rotated)).unwrap(),
        b"first\n"
    );
    assert_eq!(std::fs::read(dir.path().join("web/app.log")).unwrap(), b"");
}

#[tokio::test]
async fn test_rotate_unknown_key_reports_error() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_over(&dir).await;
    let address = pipeline.address;

    let client = tokio::spawn(async move {
        request(address, b"ROTATE web never-written.log\n").await
    });
    pipeline.route_one().await;
    assert_eq!(client.await.unwrap(), b"500 ERR\n");

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_malformed_header_closes_connection() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_over(&dir).await;
    let address = pipeline.address;

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(address).await.unwrap();
        stream.write_all(b"NOT A VALID HEADER\n").await.unwrap();
        stream.shutdown().await.unwrap();

        // No response: the router logs the decode error and drops the
        // connection (a reset instead of EOF is fine too).
        let mut response = Vec::new();
        let _ = stream.read_to_end(&mut response).await;
        response
    });
    pipeline.route_one().await;
    assert_eq!(client.await.unwrap(), b"");

    let mut errored = false;
    for _ in 0..50 {
        if pipeline.metrics.snapshot().errors > 0 {
            errored = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(errored, "router never counted the decode error");

    let registry = pipeline.shutdown().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_consecutive_dumps_append() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_over(&dir).await;
    let address = pipeline.address;

    for i in 0..3 {
        let payload = format!("DUMP web app.log\nline {i}\n");
        let client = tokio::spawn(async move { request(address, payload.as_bytes()).await });
        pipeline.route_one().await;
        assert_eq!(client.await.unwrap(), b"200 OK\n");
    }

    let registry = pipeline.shutdown().await;
    registry
        .get_file("web/app.log")
        .unwrap()
        .bufferer()
        .lock()
        .await
        .close()
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("web/app.log")).unwrap(),
        "line 0\nline 1\nline 2\n"
    );
}
