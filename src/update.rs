//! Remote archive metadata, for "is there something newer" checks
//!
//! Not part of the install pipeline: one HEAD request whose result is shown
//! to the user.

use crate::downloaders::{FetchError, HttpClient};
use reqwest::header::{CONTENT_LENGTH, LAST_MODIFIED};
use tracing::debug;

/// What the server reports about the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArchive {
    /// URL after redirects
    pub url: String,
    pub size: Option<u64>,
    /// Raw `Last-Modified` header value
    pub last_modified: Option<String>,
}

/// HEAD `url` and report the archive's size and modification time
pub async fn check_remote_archive(client: &HttpClient, url: &str) -> Result<RemoteArchive, FetchError> {
    let response = client
        .inner()
        .head(url)
        .send()
        .await
        .map_err(|source| FetchError::Connect {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: status.canonical_reason().unwrap_or("No details").to_string(),
        });
    }

    // content_length() reflects the (empty) HEAD body, so read the header
    let headers = response.headers();
    let size = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    debug!("HEAD {} -> size={:?} last_modified={:?}", url, size, last_modified);

    Ok(RemoteArchive {
        url: response.url().to_string(),
        size,
        last_modified,
    })
}
