//! HTTP client and streaming archive download with progress tracking

use crate::progress::{CancelToken, Phase, Progress, ProgressSender};
use futures::StreamExt;
use indicatif::HumanBytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Connection timeout: time to establish TCP connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read timeout: maximum time to wait for data between chunks.
/// A stalled transfer surfaces as a stream error after this long.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Overall request timeout for a single download
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Bytes written (and reported) per progress step
pub const CHUNK_SIZE: usize = 8192;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Connection failed for {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Download interrupted after {received} bytes: {source}")]
    Interrupted {
        received: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download incomplete: expected {expected} bytes, got {received}")]
    Incomplete { expected: u64, received: u64 },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download cancelled")]
    Cancelled,
}

/// Shared HTTP client
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, FetchError> {
        // reqwest follows up to 10 redirects by default
        let client = reqwest::Client::builder()
            .user_agent(concat!("pt-installer/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Name the body is streamed into before it is moved to its final path
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    destination.with_file_name(name)
}

/// Download `url` to `destination`, reporting progress after every chunk.
///
/// The body is written to a `.part` sibling and renamed into place only
/// once complete, so `destination` never holds a partial file. On any
/// failure the partial file is removed. Returns the number of bytes written.
pub async fn fetch_archive(
    client: &HttpClient,
    url: &str,
    destination: &Path,
    progress: &ProgressSender,
    cancel: &CancelToken,
) -> Result<u64, FetchError> {
    let partial = partial_path(destination);

    let written = match stream_to_file(client, url, &partial, progress, cancel).await {
        Ok(written) => written,
        Err(e) => {
            discard_partial(&partial).await;
            return Err(e);
        }
    };

    if let Err(source) = tokio::fs::rename(&partial, destination).await {
        discard_partial(&partial).await;
        return Err(FetchError::Io {
            path: destination.to_path_buf(),
            source,
        });
    }

    info!("Downloaded {} to {}", HumanBytes(written), destination.display());
    Ok(written)
}

async fn stream_to_file(
    client: &HttpClient,
    url: &str,
    partial: &Path,
    progress: &ProgressSender,
    cancel: &CancelToken,
) -> Result<u64, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    progress.emit(
        Phase::Downloading,
        Progress::Indeterminate,
        format!("Connecting to {}", truncate_url(url)),
    );

    let response = client
        .inner()
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Connect {
            url: truncate_url(url),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: truncate_error(&body),
        });
    }

    let total_size = response.content_length();
    debug!("Response {} for {} (length: {:?})", status, truncate_url(url), total_size);

    let io_err = |source| FetchError::Io {
        path: partial.to_path_buf(),
        source,
    };
    let mut file = File::create(partial).await.map_err(io_err)?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    loop {
        let chunk_result = tokio::select! {
            next = stream.next() => match next {
                Some(chunk_result) => chunk_result,
                None => break,
            },
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        };
        let chunk = chunk_result.map_err(|source| FetchError::Interrupted {
            received: written,
            source,
        })?;

        for piece in chunk.chunks(CHUNK_SIZE) {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            file.write_all(piece).await.map_err(io_err)?;
            written += piece.len() as u64;
            report(progress, written, total_size);
        }
    }

    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    drop(file);

    if let Some(expected) = total_size {
        if written < expected {
            return Err(FetchError::Incomplete {
                expected,
                received: written,
            });
        }
    }

    Ok(written)
}

fn report(progress: &ProgressSender, written: u64, total_size: Option<u64>) {
    match total_size {
        Some(total) => progress.emit(
            Phase::Downloading,
            Progress::from_counts(written, total),
            format!("Downloading: {} / {}", HumanBytes(written), HumanBytes(total)),
        ),
        None => progress.emit(
            Phase::Downloading,
            Progress::Indeterminate,
            format!("Downloading: {}", HumanBytes(written)),
        ),
    }
}

/// Remove a partial download, logging anything other than "already gone"
async fn discard_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!("Removed partial download {}", partial.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {}: {}", partial.display(), e),
    }
}

/// Truncate URL for error messages
fn truncate_url(url: &str) -> String {
    if url.chars().count() > 80 {
        format!("{}...", url.chars().take(77).collect::<String>())
    } else {
        url.to_string()
    }
}

/// Truncate error body for display
fn truncate_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 100 {
        format!("{}...", trimmed.chars().take(97).collect::<String>())
    } else if trimmed.is_empty() {
        "No details".to_string()
    } else {
        trimmed.to_string()
    }
}
