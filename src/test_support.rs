//! Fixtures shared by the unit tests: a throwaway HTTP server and ZIP builder

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;

/// Canned response served for every request
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// 200 with an accurate Content-Length
    Ok(Vec<u8>),
    /// 200 without Content-Length; the body ends when the connection closes
    NoLength(Vec<u8>),
    /// 200 declaring `declared` bytes but closing after `body`
    Truncated { declared: usize, body: Vec<u8> },
    /// 200 declaring `declared` bytes, sending `body`, then holding the
    /// connection open without sending more
    Stalled { declared: usize, body: Vec<u8> },
    /// Error status with a short text body
    Status(u16, &'static str),
}

impl Reply {
    fn to_bytes(&self) -> Vec<u8> {
        let (head, body) = match self {
            Reply::Ok(body) => (
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nLast-Modified: Tue, 01 Oct 2024 10:00:00 GMT\r\nConnection: close\r\n\r\n",
                    body.len()
                ),
                body.clone(),
            ),
            Reply::NoLength(body) => (
                "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string(),
                body.clone(),
            ),
            Reply::Truncated { declared, body } | Reply::Stalled { declared, body } => (
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    declared
                ),
                body.clone(),
            ),
            Reply::Status(code, reason) => (
                format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    code,
                    reason,
                    reason.len()
                ),
                reason.as_bytes().to_vec(),
            ),
        };
        let mut out = head.into_bytes();
        out.extend_from_slice(&body);
        out
    }
}

/// Running test server
pub(crate) struct TestServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Number of connections accepted so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `reply` on an ephemeral localhost port until the runtime shuts down
pub(crate) async fn serve(reply: Reply) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let response = reply.to_bytes();
    let stall = matches!(reply, Reply::Stalled { .. });

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let response = response.clone();
            tokio::spawn(async move {
                // Consume the request head before answering
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let _ = socket.write_all(&response).await;
                if stall {
                    std::future::pending::<()>().await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer {
        url: format!("http://{}/platform-tools-latest.zip", addr),
        hits,
    }
}

/// Build a ZIP archive in memory. Names ending in `/` become directories.
pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// A small archive shaped like the real platform-tools download
pub(crate) fn platform_tools_zip() -> Vec<u8> {
    zip_bytes(&[
        ("platform-tools/", b""),
        ("platform-tools/adb", b"#!/bin/sh\necho adb\n"),
        ("platform-tools/adb.exe", b"MZ fake"),
        ("platform-tools/fastboot", b"#!/bin/sh\necho fastboot\n"),
        ("platform-tools/lib64/libc++.so", b"ELF fake"),
        ("platform-tools/NOTICE.txt", b"notice"),
    ])
}
