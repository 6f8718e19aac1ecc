//! pt-installer - Android Platform Tools installer
//!
//! Downloads the platform-tools archive for this OS, extracts it, and
//! optionally puts it on PATH and on the desktop.

pub mod archive;
pub mod config;
pub mod downloaders;
pub mod error;
pub mod installer;
pub mod logging;
pub mod path_env;
pub mod platform;
pub mod progress;
pub mod shortcut;
pub mod update;

#[cfg(test)]
mod test_support;

pub use error::InstallError;
pub use installer::{InstallRequest, InstallResult, Installer};
