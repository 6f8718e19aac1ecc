//! Archive download
//!
//! Streams the platform-tools ZIP to local storage with byte-level progress.
//! Failed downloads are not retried; the user re-triggers the run.

mod http;

pub use http::{fetch_archive, partial_path, FetchError, HttpClient, CHUNK_SIZE};
