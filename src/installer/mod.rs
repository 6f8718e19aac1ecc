//! Installation orchestrator
//!
//! Coordinates the phases of one install run:
//! 1. Validate:  target directory and URL, before any side effect
//! 2. Download:  stream the archive into a private staging directory
//! 3. Extract:   unpack into the target directory
//! 4. PATH:      register the tool directory (optional)
//! 5. Shortcut:  desktop launcher for the executable (optional)
//! 6. Cleanup:   remove the staging directory, success or not
//!
//! PATH and shortcut failures do not abort the run; they are reported as
//! warnings on an otherwise successful result.

pub mod config;
pub mod service;

pub use config::{InstallRequest, RequestError};
pub use service::{InstallService, RunningInstall};

use crate::archive::extract_zip;
use crate::downloaders::{fetch_archive, FetchError, HttpClient};
use crate::error::InstallError;
use crate::path_env::{self, PathRegistrar, Registration};
use crate::platform;
use crate::progress::{CancelToken, Phase, Progress, ProgressSender};
use crate::shortcut::{DesktopShortcuts, ShortcutCreator};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Name of the downloaded archive inside the staging directory
const STAGED_ARCHIVE: &str = "platform-tools.zip";

fn log_phase_metrics(phase: &str, started: Instant) {
    info!(
        "Phase done: phase='{}' elapsed_ms={}",
        phase,
        started.elapsed().as_millis()
    );
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    ValidatingInput,
    Downloading,
    Extracting,
    UpdatingPath,
    CreatingShortcut,
    CleaningUp,
    Succeeded,
    Failed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Directory the archive was extracted into
    pub install_dir: PathBuf,
    /// Directory holding the executables (registered on PATH)
    pub tool_dir: PathBuf,
    pub bytes_downloaded: u64,
    pub files_extracted: usize,
    /// Set when PATH registration was requested and succeeded
    pub path_registration: Option<Registration>,
    /// Set when a shortcut was requested and created
    pub shortcut: Option<PathBuf>,
    /// Non-fatal failures (PATH, shortcut)
    pub warnings: Vec<InstallError>,
}

/// Terminal value of one install run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    Succeeded(InstallReport),
    Failed(InstallError),
}

impl InstallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallResult::Succeeded(_))
    }

    /// Succeeded, but a PATH or shortcut step failed
    pub fn is_partial(&self) -> bool {
        matches!(self, InstallResult::Succeeded(report) if !report.warnings.is_empty())
    }
}

/// Runs one install request through the pipeline
pub struct Installer {
    request: InstallRequest,
    registrar: Option<Box<dyn PathRegistrar>>,
    shortcuts: Option<Box<dyn ShortcutCreator>>,
    temp_root: Option<PathBuf>,
    system_wide: bool,
    state: InstallState,
}

impl Installer {
    pub fn new(request: InstallRequest) -> Self {
        Self {
            request,
            registrar: None,
            shortcuts: None,
            temp_root: None,
            system_wide: false,
            state: InstallState::Idle,
        }
    }

    /// PATH storage to use instead of the platform default
    pub fn with_registrar(mut self, registrar: Box<dyn PathRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Shortcut creator to use instead of the user's desktop
    pub fn with_shortcuts(mut self, shortcuts: Box<dyn ShortcutCreator>) -> Self {
        self.shortcuts = Some(shortcuts);
        self
    }

    /// Parent directory for the staging directory (system temp by default)
    pub fn with_temp_root(mut self, temp_root: PathBuf) -> Self {
        self.temp_root = Some(temp_root);
        self
    }

    /// Use machine-wide PATH storage where the platform has one
    pub fn system_wide(mut self, system_wide: bool) -> Self {
        self.system_wide = system_wide;
        self
    }

    fn enter(&mut self, next: InstallState) {
        debug!("Install state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run the pipeline to completion.
    ///
    /// Emits progress events on `progress`, ending with exactly one `Done`
    /// or `Failed` event. The staging directory is removed before the
    /// terminal event in every outcome.
    pub async fn run(mut self, progress: ProgressSender, cancel: CancelToken) -> InstallResult {
        let started = Instant::now();
        let mut staging: Option<TempDir> = None;

        let outcome = self.execute(&progress, &cancel, &mut staging).await;

        self.enter(InstallState::CleaningUp);
        if let Some(dir) = staging.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove staging directory {}: {}", path.display(), e);
            }
        }
        log_phase_metrics("Install", started);

        match outcome {
            Ok(report) => {
                self.enter(InstallState::Succeeded);
                let message = if report.warnings.is_empty() {
                    format!("Installed to {}", report.tool_dir.display())
                } else {
                    format!(
                        "Installed to {} with {} warning(s)",
                        report.tool_dir.display(),
                        report.warnings.len()
                    )
                };
                info!("{}", message);
                progress.emit(Phase::Done, Progress::Fraction(1.0), message);
                InstallResult::Succeeded(report)
            }
            Err(e) => {
                self.enter(InstallState::Failed);
                warn!("Install failed ({}): {}", e.kind(), e);
                progress.emit(Phase::Failed, Progress::Indeterminate, e.to_string());
                InstallResult::Failed(e)
            }
        }
    }

    async fn execute(
        &mut self,
        progress: &ProgressSender,
        cancel: &CancelToken,
        staging: &mut Option<TempDir>,
    ) -> Result<InstallReport, InstallError> {
        // === Validate ===
        self.enter(InstallState::ValidatingInput);
        self.request.validate()?;
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        let target = self.request.target_dir.clone();
        info!("Installing {} into {}", self.request.source_url, target.display());

        // === Download ===
        let download_start = Instant::now();
        self.enter(InstallState::Downloading);
        let client = HttpClient::new()?;
        let staging_dir = staging.insert(create_staging_dir(self.temp_root.as_deref())?);
        let archive_path = staging_dir.path().join(STAGED_ARCHIVE);

        let bytes_downloaded = fetch_archive(
            &client,
            &self.request.source_url,
            &archive_path,
            progress,
            cancel,
        )
        .await?;
        log_phase_metrics("Downloading", download_start);

        // === Extract ===
        let extract_start = Instant::now();
        self.enter(InstallState::Extracting);
        progress.emit(Phase::Extracting, Progress::Fraction(0.0), "Extracting archive...");
        let summary = {
            let archive_path = archive_path.clone();
            let target = target.clone();
            let progress = progress.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                extract_zip(&archive_path, &target, &progress, &cancel)
            })
            .await
            .map_err(|e| InstallError::Extraction(format!("Extraction task failed: {}", e)))??
        };
        log_phase_metrics("Extracting", extract_start);

        let tool_dir = match &summary.root_dir {
            Some(root) => target.join(root),
            None => target.clone(),
        };

        let mut report = InstallReport {
            install_dir: target,
            tool_dir,
            bytes_downloaded,
            files_extracted: summary.files,
            path_registration: None,
            shortcut: None,
            warnings: Vec::new(),
        };

        // === PATH ===
        if self.request.add_to_path {
            self.enter(InstallState::UpdatingPath);
            progress.emit(
                Phase::UpdatingPath,
                Progress::Indeterminate,
                format!("Adding {} to PATH", report.tool_dir.display()),
            );
            let registered = self.register_path(&report.tool_dir);
            report.path_registration = non_fatal(registered, &mut report.warnings)?;
        }

        // === Shortcut ===
        if self.request.create_shortcut {
            self.enter(InstallState::CreatingShortcut);
            progress.emit(
                Phase::CreatingShortcut,
                Progress::Indeterminate,
                "Creating desktop shortcut",
            );
            let executable = report.tool_dir.join(platform::executable_name());
            let created = self.create_shortcut(&executable);
            report.shortcut = non_fatal(created, &mut report.warnings)?;
        }

        Ok(report)
    }

    fn register_path(&mut self, tool_dir: &Path) -> Result<Registration, InstallError> {
        let registrar = match self.registrar.take() {
            Some(registrar) => registrar,
            None => path_env::for_current_platform(self.system_wide)?,
        };
        let result = registrar.register(tool_dir);
        self.registrar = Some(registrar);
        Ok(result?)
    }

    fn create_shortcut(&mut self, executable: &Path) -> Result<PathBuf, InstallError> {
        let shortcuts: Box<dyn ShortcutCreator> = match self.shortcuts.take() {
            Some(shortcuts) => shortcuts,
            None => Box::new(DesktopShortcuts::for_current_user()?),
        };
        let result = shortcuts.create_shortcut(executable, platform::SHORTCUT_LABEL);
        self.shortcuts = Some(shortcuts);
        Ok(result?)
    }
}

/// Move a non-fatal error into `warnings`; fatal errors still abort the run
fn non_fatal<T>(
    result: Result<T, InstallError>,
    warnings: &mut Vec<InstallError>,
) -> Result<Option<T>, InstallError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if !e.is_fatal() => {
            warn!("{}", e);
            warnings.push(e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn create_staging_dir(temp_root: Option<&Path>) -> Result<TempDir, InstallError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pt-installer-");
    let result = match temp_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    };
    result.map_err(|source| {
        FetchError::Io {
            path: temp_root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
            source,
        }
        .into()
    })
}
