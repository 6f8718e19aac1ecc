//! Platform-selected download source and install defaults

use std::path::PathBuf;

const DOWNLOAD_BASE: &str = "https://dl.google.com/android/repository";

/// Label used for the desktop shortcut and in user-facing messages
pub const SHORTCUT_LABEL: &str = "Platform Tools";

/// Archive name for the OS this binary was built for
pub fn archive_name() -> &'static str {
    if cfg!(windows) {
        "platform-tools-latest-windows.zip"
    } else if cfg!(target_os = "macos") {
        "platform-tools-latest-darwin.zip"
    } else {
        "platform-tools-latest-linux.zip"
    }
}

/// Download URL for the current OS
pub fn default_download_url() -> String {
    format!("{}/{}", DOWNLOAD_BASE, archive_name())
}

/// Executable the shortcut points at
pub fn executable_name() -> &'static str {
    if cfg!(windows) {
        "adb.exe"
    } else {
        "adb"
    }
}

/// `<home>/Android`, used when no directory is given or remembered
pub fn default_install_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Android"))
}
