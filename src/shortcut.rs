//! Desktop shortcut creation
//!
//! - Linux/BSD: freedesktop `.desktop` entry
//! - macOS: `.command` script Finder can double-click
//! - Windows: `.lnk` built through PowerShell's `WScript.Shell`

use std::path::{Path, PathBuf};
use tracing::info;

/// Shortcut creation errors
#[derive(Debug, thiserror::Error)]
pub enum ShortcutError {
    #[error("Could not determine the desktop directory")]
    NoDesktop,

    #[error("Shortcut label is empty")]
    EmptyLabel,

    #[error("Shortcut target does not exist: {}", .0.display())]
    MissingTarget(PathBuf),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PowerShell failed to create the shortcut (exit {0:?})")]
    Command(Option<i32>),
}

/// Creates a launcher pointing at an installed executable
pub trait ShortcutCreator: Send + Sync {
    /// Create the launcher and return where it was written. The working
    /// directory is the executable's containing directory.
    fn create_shortcut(&self, target: &Path, label: &str) -> Result<PathBuf, ShortcutError>;
}

/// Writes launchers into a desktop directory
#[derive(Debug, Clone)]
pub struct DesktopShortcuts {
    desktop_dir: PathBuf,
}

impl DesktopShortcuts {
    pub fn new(desktop_dir: PathBuf) -> Self {
        Self { desktop_dir }
    }

    /// Shortcuts on the current user's desktop
    pub fn for_current_user() -> Result<Self, ShortcutError> {
        dirs::desktop_dir()
            .map(Self::new)
            .ok_or(ShortcutError::NoDesktop)
    }

    /// Where the launcher for `label` goes
    pub fn shortcut_path(&self, label: &str) -> Result<PathBuf, ShortcutError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ShortcutError::EmptyLabel);
        }
        let file_stem: String = label
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
            .collect();
        Ok(self
            .desktop_dir
            .join(format!("{}.{}", file_stem, LAUNCHER_EXTENSION)))
    }
}

impl ShortcutCreator for DesktopShortcuts {
    fn create_shortcut(&self, target: &Path, label: &str) -> Result<PathBuf, ShortcutError> {
        let shortcut = self.shortcut_path(label)?;
        if !target.is_file() {
            return Err(ShortcutError::MissingTarget(target.to_path_buf()));
        }
        let working_dir = target.parent().unwrap_or_else(|| Path::new("."));

        std::fs::create_dir_all(&self.desktop_dir).map_err(|source| ShortcutError::Io {
            path: self.desktop_dir.clone(),
            source,
        })?;

        write_launcher(&shortcut, target, working_dir, label.trim())?;
        info!("Created shortcut {}", shortcut.display());
        Ok(shortcut)
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
const LAUNCHER_EXTENSION: &str = "desktop";
#[cfg(target_os = "macos")]
const LAUNCHER_EXTENSION: &str = "command";
#[cfg(windows)]
const LAUNCHER_EXTENSION: &str = "lnk";

#[cfg(all(unix, not(target_os = "macos")))]
fn write_launcher(
    shortcut: &Path,
    target: &Path,
    working_dir: &Path,
    label: &str,
) -> Result<(), ShortcutError> {
    let entry = format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={}\n\
         Exec={}\n\
         Path={}\n\
         Terminal=true\n",
        label,
        desktop_exec_quote(&target.to_string_lossy()),
        working_dir.display()
    );
    write_executable(shortcut, &entry)
}

#[cfg(target_os = "macos")]
fn write_launcher(
    shortcut: &Path,
    target: &Path,
    working_dir: &Path,
    _label: &str,
) -> Result<(), ShortcutError> {
    let script = format!(
        "#!/bin/sh\ncd {} || exit 1\nexec {} \"$@\"\n",
        sh_quote(&working_dir.to_string_lossy()),
        sh_quote(&target.to_string_lossy())
    );
    write_executable(shortcut, &script)
}

#[cfg(windows)]
fn write_launcher(
    shortcut: &Path,
    target: &Path,
    working_dir: &Path,
    label: &str,
) -> Result<(), ShortcutError> {
    use std::process::Command;

    let script = format!(
        "$WshShell = New-Object -ComObject WScript.Shell; \
         $Shortcut = $WshShell.CreateShortcut({}); \
         $Shortcut.TargetPath = {}; \
         $Shortcut.WorkingDirectory = {}; \
         $Shortcut.Description = {}; \
         $Shortcut.Save();",
        ps_quote(&shortcut.display().to_string()),
        ps_quote(&target.display().to_string()),
        ps_quote(&working_dir.display().to_string()),
        ps_quote(label)
    );

    let status = Command::new("powershell")
        .arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-Command")
        .arg(script)
        .status()
        .map_err(|source| ShortcutError::Io {
            path: shortcut.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(ShortcutError::Command(status.code()));
    }
    Ok(())
}

/// Write a launcher file and mark it executable
#[cfg(unix)]
fn write_executable(path: &Path, content: &str) -> Result<(), ShortcutError> {
    use std::os::unix::fs::PermissionsExt;

    let io_err = |source| ShortcutError::Io {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(path, content).map_err(io_err)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(io_err)
}

/// Quote an argument for a desktop entry `Exec` key
#[cfg(all(unix, not(target_os = "macos")))]
fn desktop_exec_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(target_os = "macos")]
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(windows)]
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
