//! ZIP extraction into the install directory.
//!
//! Every entry name is vetted before anything is written: an archive with a
//! single entry that would land outside the destination is rejected whole.

use crate::progress::{CancelToken, Phase, Progress, ProgressSender};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Permission bits granted to every extracted file on Unix
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt archive: {0}")]
    Corrupt(#[from] zip::result::ZipError),

    #[error("Archive entry escapes the install directory: {0}")]
    UnsafeEntry(String),

    #[error("Failed to extract {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Extraction cancelled")]
    Cancelled,
}

/// What an extraction produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Regular files written
    pub files: usize,
    /// Directory entries created
    pub directories: usize,
    /// Top-level folder shared by every entry, if there is exactly one
    pub root_dir: Option<String>,
}

/// Extract `archive_path` into `destination`, then delete the archive.
///
/// The destination (and any missing parents) is created. Entries keep their
/// relative paths; existing files with the same name are overwritten, other
/// files in the destination are left alone. Cancellation is checked between
/// entries.
pub fn extract_zip(
    archive_path: &Path,
    destination: &Path,
    progress: &ProgressSender,
    cancel: &CancelToken,
) -> Result<ExtractSummary, ExtractError> {
    let file = File::open(archive_path).map_err(|source| ExtractError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

    let entries = vet_entries(&mut archive)?;
    let total = entries.len() as u64;

    fs::create_dir_all(destination).map_err(|source| ExtractError::CreateDir {
        path: destination.to_path_buf(),
        source,
    })?;

    let mut summary = ExtractSummary {
        root_dir: common_root(&entries),
        ..Default::default()
    };

    for (i, vetted) in entries.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let output_path = destination.join(&vetted.path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|source| ExtractError::CreateDir {
                path: output_path.clone(),
                source,
            })?;
            summary.directories += 1;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).map_err(|source| ExtractError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let entry_err = |source| ExtractError::Entry {
                name: name.clone(),
                source,
            };
            let mut outfile = File::create(&output_path).map_err(entry_err)?;
            io::copy(&mut entry, &mut outfile).map_err(entry_err)?;
            drop(outfile);

            apply_permissions(&output_path, entry.unix_mode());
            summary.files += 1;
        }

        progress.emit(
            Phase::Extracting,
            Progress::from_counts(i as u64 + 1, total),
            format!("Extracting: {}", name),
        );
    }

    info!(
        "Extracted {} files and {} directories to {}",
        summary.files,
        summary.directories,
        destination.display()
    );

    if let Err(e) = fs::remove_file(archive_path) {
        warn!("Failed to delete archive {}: {}", archive_path.display(), e);
    } else {
        debug!("Deleted archive {}", archive_path.display());
    }

    Ok(summary)
}

/// An archive entry that passed vetting
#[derive(Debug, Clone)]
struct VettedEntry {
    path: PathBuf,
    is_dir: bool,
}

/// Resolve every entry to a safe relative path, failing on the first one
/// that is absolute or climbs out with `..`.
fn vet_entries<R: io::Read + io::Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<Vec<VettedEntry>, ExtractError> {
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let safe = entry
            .enclosed_name()
            .and_then(|_| safe_relative_path(entry.name()));
        match safe {
            Some(path) => entries.push(VettedEntry {
                path,
                is_dir: entry.is_dir(),
            }),
            None => return Err(ExtractError::UnsafeEntry(entry.name().to_string())),
        }
    }
    Ok(entries)
}

/// Convert an archive entry name to a relative path, or `None` if it could
/// resolve outside the destination.
///
/// Backslashes are treated as separators, `.` segments are dropped, and any
/// `..` segment, root or drive prefix is refused.
pub fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') {
        return None;
    }

    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Top-level folder every entry lives under, when there is exactly one and
/// no file sits directly at the archive root.
fn common_root(entries: &[VettedEntry]) -> Option<String> {
    let mut root: Option<&std::ffi::OsStr> = None;
    for entry in entries {
        let mut components = entry.path.components();
        let first = match components.next() {
            Some(Component::Normal(first)) => first,
            _ => return None,
        };
        if components.next().is_none() && !entry.is_dir {
            return None;
        }
        match root {
            None => root = Some(first),
            Some(existing) if existing != first => return None,
            Some(_) => {}
        }
    }
    root.map(|r| r.to_string_lossy().into_owned())
}

/// Make an extracted file executable. A failure is logged and skipped.
#[cfg(unix)]
fn apply_permissions(path: &Path, archived_mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;

    let mode = archived_mode.map(|m| m & 0o777).unwrap_or(0o644) | EXECUTABLE_MODE;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        warn!("Failed to set permissions on {}: {}", path.display(), e);
    }
}

/// Windows has no executable bit to grant.
#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _archived_mode: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CancelHandle;
    use crate::test_support::{platform_tools_zip, zip_bytes};
    use tempfile::TempDir;

    fn write_archive(dir: &Path, bytes: &[u8]) -> PathBuf {
        let path = dir.join("archive.zip");
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(
            safe_relative_path("platform-tools/adb"),
            Some(PathBuf::from("platform-tools/adb"))
        );
        assert_eq!(
            safe_relative_path("./platform-tools\\lib64\\x.so"),
            Some(PathBuf::from("platform-tools/lib64/x.so"))
        );
        assert_eq!(safe_relative_path("../evil.txt"), None);
        assert_eq!(safe_relative_path("a/../../evil.txt"), None);
        assert_eq!(safe_relative_path("..\\evil.txt"), None);
        assert_eq!(safe_relative_path("/etc/passwd"), None);
        assert_eq!(safe_relative_path("\\windows\\system32"), None);
        assert_eq!(safe_relative_path(""), None);
        assert_eq!(safe_relative_path("./"), None);
    }

    fn vetted(path: &str, is_dir: bool) -> VettedEntry {
        VettedEntry {
            path: PathBuf::from(path),
            is_dir,
        }
    }

    #[test]
    fn test_common_root() {
        let entries = vec![
            vetted("platform-tools", true),
            vetted("platform-tools/adb", false),
            vetted("platform-tools/lib64/x.so", false),
        ];
        assert_eq!(common_root(&entries), Some("platform-tools".to_string()));

        // Archives without explicit directory entries
        let implicit = vec![vetted("tools/adb", false), vetted("tools/fastboot", false)];
        assert_eq!(common_root(&implicit), Some("tools".to_string()));

        let mixed = vec![vetted("a/x", false), vetted("b/y", false)];
        assert_eq!(common_root(&mixed), None);

        let loose_file = vec![vetted("adb", false), vetted("adb-docs/readme", false)];
        assert_eq!(common_root(&loose_file), None);

        assert_eq!(common_root(&[]), None);
    }

    #[test]
    fn test_extract_creates_nested_destination() {
        let temp_dir = TempDir::new().unwrap();
        let archive = write_archive(temp_dir.path(), &platform_tools_zip());
        let destination = temp_dir.path().join("does/not/exist/yet");
        let (tx, mut rx) = ProgressSender::channel();

        let summary = extract_zip(&archive, &destination, &tx, &CancelToken::never()).unwrap();

        assert_eq!(summary.files, 5);
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.root_dir.as_deref(), Some("platform-tools"));
        assert_eq!(
            fs::read(destination.join("platform-tools/adb")).unwrap(),
            b"#!/bin/sh\necho adb\n"
        );
        assert!(destination.join("platform-tools/lib64/libc++.so").is_file());
        // Archive is removed once everything is on disk
        assert!(!archive.exists());

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.phase, Phase::Extracting);
            last = Some(event);
        }
        assert_eq!(last.unwrap().progress, Progress::Fraction(1.0));
    }

    #[test]
    fn test_extract_keeps_unrelated_files() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("install");
        fs::create_dir_all(destination.join("platform-tools")).unwrap();
        fs::write(destination.join("platform-tools/user-notes.txt"), "mine").unwrap();
        let archive = write_archive(temp_dir.path(), &platform_tools_zip());

        extract_zip(
            &archive,
            &destination,
            &ProgressSender::disconnected(),
            &CancelToken::never(),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(destination.join("platform-tools/user-notes.txt")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn test_path_traversal_rejected_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = zip_bytes(&[
            ("platform-tools/adb", b"ok"),
            ("../evil.txt", b"escaped"),
        ]);
        let archive = write_archive(temp_dir.path(), &bytes);
        let destination = temp_dir.path().join("install");

        let err = extract_zip(
            &archive,
            &destination,
            &ProgressSender::disconnected(),
            &CancelToken::never(),
        )
        .unwrap_err();

        assert!(matches!(err, ExtractError::UnsafeEntry(ref name) if name == "../evil.txt"));
        assert!(!temp_dir.path().join("evil.txt").exists());
        assert!(!destination.join("platform-tools/adb").exists());
    }

    #[test]
    fn test_corrupt_archive() {
        let temp_dir = TempDir::new().unwrap();
        let archive = write_archive(temp_dir.path(), b"this is not a zip file at all");

        let err = extract_zip(
            &archive,
            &temp_dir.path().join("install"),
            &ProgressSender::disconnected(),
            &CancelToken::never(),
        )
        .unwrap_err();

        assert!(matches!(err, ExtractError::Corrupt(_)));
    }

    #[test]
    fn test_missing_archive() {
        let temp_dir = TempDir::new().unwrap();
        let err = extract_zip(
            &temp_dir.path().join("missing.zip"),
            &temp_dir.path().join("install"),
            &ProgressSender::disconnected(),
            &CancelToken::never(),
        )
        .unwrap_err();

        assert!(matches!(err, ExtractError::Open { .. }));
    }

    #[test]
    fn test_cancelled_between_entries() {
        let temp_dir = TempDir::new().unwrap();
        let archive = write_archive(temp_dir.path(), &platform_tools_zip());
        let (handle, token) = CancelHandle::new();
        handle.cancel();

        let err = extract_zip(
            &archive,
            &temp_dir.path().join("install"),
            &ProgressSender::disconnected(),
            &token,
        )
        .unwrap_err();

        assert!(matches!(err, ExtractError::Cancelled));
        // Only a finished extraction consumes the archive
        assert!(archive.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extracted_files_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let archive = write_archive(temp_dir.path(), &platform_tools_zip());
        let destination = temp_dir.path().join("install");

        extract_zip(
            &archive,
            &destination,
            &ProgressSender::disconnected(),
            &CancelToken::never(),
        )
        .unwrap();

        for file in ["platform-tools/adb", "platform-tools/fastboot", "platform-tools/NOTICE.txt"] {
            let mode = fs::metadata(destination.join(file)).unwrap().permissions().mode();
            assert_eq!(mode & 0o100, 0o100, "{} is not owner-executable", file);
        }
    }
}
