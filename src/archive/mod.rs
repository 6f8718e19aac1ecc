//! Archive handling.
//!
//! Extracts the downloaded ZIP with the native `zip` crate. Entry names are
//! checked for path traversal before anything touches the disk.

pub mod extract;

pub use extract::{extract_zip, safe_relative_path, ExtractError, ExtractSummary};
