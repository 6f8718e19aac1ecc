//! Install error taxonomy
//!
//! Leaf components return their own typed errors; the orchestrator folds
//! them into [`InstallError`] so every failure kind reaches the user as a
//! distinct, human-readable message.

use crate::archive::ExtractError;
use crate::downloaders::FetchError;
use crate::installer::RequestError;
use crate::path_env::PathUpdateError;
use crate::shortcut::ShortcutError;

/// Errors surfaced by an install run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    /// Bad or missing target directory. Raised before any side effect.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Download failure. The user may retry; nothing retries automatically.
    #[error("Download failed: {0}")]
    Network(String),

    /// Corrupt archive or an entry escaping the target directory
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// PATH could not be updated; the files are still installed
    #[error("Could not update PATH: {0}")]
    PathUpdate(String),

    /// Shortcut could not be created; the files are still installed
    #[error("Could not create shortcut: {0}")]
    Shortcut(String),

    #[error("Installation cancelled")]
    Cancelled,

    #[error("Another installation is already running")]
    AlreadyRunning,
}

impl InstallError {
    /// Whether this error aborts the remaining pipeline steps.
    ///
    /// PATH and shortcut failures are recorded as warnings on an otherwise
    /// successful install.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, InstallError::PathUpdate(_) | InstallError::Shortcut(_))
    }

    /// Short name of the error kind, for logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            InstallError::InvalidInput(_) => "InvalidInputError",
            InstallError::Network(_) => "NetworkError",
            InstallError::Extraction(_) => "ExtractionError",
            InstallError::PathUpdate(_) => "PathUpdateError",
            InstallError::Shortcut(_) => "ShortcutError",
            InstallError::Cancelled => "Cancelled",
            InstallError::AlreadyRunning => "AlreadyRunning",
        }
    }
}

impl From<RequestError> for InstallError {
    fn from(e: RequestError) -> Self {
        InstallError::InvalidInput(e.to_string())
    }
}

impl From<FetchError> for InstallError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled => InstallError::Cancelled,
            other => InstallError::Network(other.to_string()),
        }
    }
}

impl From<ExtractError> for InstallError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Cancelled => InstallError::Cancelled,
            other => InstallError::Extraction(other.to_string()),
        }
    }
}

impl From<PathUpdateError> for InstallError {
    fn from(e: PathUpdateError) -> Self {
        InstallError::PathUpdate(e.to_string())
    }
}

impl From<ShortcutError> for InstallError {
    fn from(e: ShortcutError) -> Self {
        InstallError::Shortcut(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(InstallError::InvalidInput("x".into()).is_fatal());
        assert!(InstallError::Network("x".into()).is_fatal());
        assert!(InstallError::Extraction("x".into()).is_fatal());
        assert!(InstallError::Cancelled.is_fatal());
        assert!(!InstallError::PathUpdate("x".into()).is_fatal());
        assert!(!InstallError::Shortcut("x".into()).is_fatal());
    }

    #[test]
    fn test_cancellation_is_not_collapsed_into_network() {
        let err: InstallError = FetchError::Cancelled.into();
        assert_eq!(err, InstallError::Cancelled);

        let err: InstallError = FetchError::Status {
            status: 404,
            body: "Not Found".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "NetworkError");
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_unsafe_entry_maps_to_extraction() {
        let err: InstallError = ExtractError::UnsafeEntry("../evil".to_string()).into();
        assert_eq!(err.kind(), "ExtractionError");
        assert!(err.to_string().contains("../evil"));
    }
}
