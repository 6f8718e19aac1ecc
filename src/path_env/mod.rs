//! Persistent PATH registration.
//!
//! One [`PathRegistrar`] capability with a storage backend per platform
//! family: the user's shell profile on Unix, the `Path` registry value on
//! Windows. Both do a narrow read-check-append and never drop or reorder
//! existing entries. Matching is exact-entry: `/opt/tools` is not "already
//! present" just because `/opt/tools-old` is.

#[cfg(unix)]
mod profile;
#[cfg(windows)]
mod registry;

#[cfg(unix)]
pub use profile::ShellProfileRegistrar;
#[cfg(windows)]
pub use registry::{RegistryRegistrar, RegistryScope};

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// PATH update errors
#[derive(Debug, thiserror::Error)]
pub enum PathUpdateError {
    #[error("{} cannot be added to PATH: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: &'static str },

    #[error("Could not determine home directory")]
    NoHome,

    #[error("Failed to read {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {location}: {source}")]
    Write {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The directory was appended to persistent storage
    Added,
    /// The directory was already an entry; storage was not written
    AlreadyPresent,
}

/// Appends a directory to a persistent PATH-like variable
pub trait PathRegistrar: Send + Sync {
    /// Add `directory` to persistent PATH unless it is already an entry.
    ///
    /// Also makes the directory visible on the current process's PATH so
    /// child processes spawned later in this run can find it.
    fn register(&self, directory: &Path) -> Result<Registration, PathUpdateError>;

    /// Where the PATH value is stored, for user-facing messages
    fn location(&self) -> String;
}

/// Registrar for the platform this binary was built for
#[cfg(unix)]
pub fn for_current_platform(_system_wide: bool) -> Result<Box<dyn PathRegistrar>, PathUpdateError> {
    Ok(Box::new(ShellProfileRegistrar::for_current_user()?))
}

/// Registrar for the platform this binary was built for
#[cfg(windows)]
pub fn for_current_platform(system_wide: bool) -> Result<Box<dyn PathRegistrar>, PathUpdateError> {
    let scope = if system_wide {
        RegistryScope::Machine
    } else {
        RegistryScope::User
    };
    Ok(Box::new(RegistryRegistrar::new(scope)))
}

/// Whether `entry` is one of the `separator`-delimited entries of `value`
pub fn contains_entry(value: &str, entry: &str, separator: char) -> bool {
    value.split(separator).any(|existing| existing == entry)
}

/// Append `entry` to `value`, dropping trailing separators first so no
/// empty entry is introduced.
pub fn append_entry(value: &str, entry: &str, separator: char) -> String {
    let trimmed = value.trim_end_matches(separator);
    if trimmed.is_empty() {
        entry.to_string()
    } else {
        format!("{}{}{}", trimmed, separator, entry)
    }
}

/// Whether `directory` is exactly one of this process's PATH entries
pub fn on_process_path(directory: &Path) -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|e| e == directory))
        .unwrap_or(false)
}

/// Add `directory` to this process's PATH if it is not already an entry
pub fn add_to_process_path(directory: &Path) {
    if on_process_path(directory) {
        return;
    }
    let current = std::env::var_os("PATH").unwrap_or_default();
    let mut entries: Vec<PathBuf> = if current.is_empty() {
        Vec::new()
    } else {
        std::env::split_paths(&current).collect()
    };
    entries.push(directory.to_path_buf());

    match std::env::join_paths(entries) {
        Ok(joined) => {
            std::env::set_var("PATH", joined);
            debug!("Added {} to process PATH", directory.display());
        }
        Err(e) => warn!("Could not add {} to process PATH: {}", directory.display(), e),
    }
}
