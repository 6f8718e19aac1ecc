//! Install request
//!
//! Everything one install run needs, built from user input before the run
//! starts and never changed while it is in flight.

use std::path::{Path, PathBuf};

/// Parameters of a single install run
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Directory the archive is extracted into (absolute)
    pub target_dir: PathBuf,

    /// Register the installed tool directory on persistent PATH
    pub add_to_path: bool,

    /// Create a desktop shortcut to the installed executable
    pub create_shortcut: bool,

    /// Archive URL
    pub source_url: String,
}

impl InstallRequest {
    pub fn new(target_dir: impl Into<PathBuf>, source_url: impl Into<String>) -> Self {
        Self {
            target_dir: target_dir.into(),
            add_to_path: false,
            create_shortcut: false,
            source_url: source_url.into(),
        }
    }

    pub fn with_path(mut self, add_to_path: bool) -> Self {
        self.add_to_path = add_to_path;
        self
    }

    pub fn with_shortcut(mut self, create_shortcut: bool) -> Self {
        self.create_shortcut = create_shortcut;
        self
    }

    /// Validate the request without touching the network.
    ///
    /// The target directory does not have to exist yet; its nearest existing
    /// ancestor must be a directory we can create files in.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.target_dir.as_os_str().is_empty() {
            return Err(RequestError::EmptyTargetDir);
        }
        if !self.target_dir.is_absolute() {
            return Err(RequestError::NotAbsolute(self.target_dir.clone()));
        }

        match reqwest::Url::parse(&self.source_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(RequestError::InvalidUrl(self.source_url.clone())),
        }

        let existing = nearest_existing(&self.target_dir)
            .ok_or_else(|| RequestError::NotADirectory(self.target_dir.clone()))?;
        if !existing.is_dir() {
            return Err(RequestError::NotADirectory(existing.to_path_buf()));
        }

        tempfile::Builder::new()
            .prefix(".pt-installer-write-check")
            .tempfile_in(existing)
            .map_err(|source| RequestError::NotWritable {
                path: existing.to_path_buf(),
                source,
            })?;

        Ok(())
    }
}

/// The directory itself if it exists, otherwise its closest existing ancestor
fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| p.exists())
}

/// Request validation errors
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("No target directory given")]
    EmptyTargetDir,

    #[error("Target directory must be absolute: {}", .0.display())]
    NotAbsolute(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Directory is not writable: {}: {source}", path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),
}
